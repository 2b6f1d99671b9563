//! Types and helpers shared by the ceremony handlers.

use crate::domain::CeremonyError;
use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

/// Header carrying the session token from a start step to its finish step.
pub const SESSION_KEY_HEADER: &str = "session-key";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    // ---
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    // ---
    pub options: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // ---
    pub error: String,
}

/// Error half of every ceremony handler's result.
pub type HandlerError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Helper Functions
// ============================================================================

pub fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    // ---
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Maps a ceremony failure onto an HTTP status and a client-safe message.
///
/// Server-side faults are reported generically; their detail stays in the log.
pub fn ceremony_error(err: CeremonyError) -> HandlerError {
    // ---
    let status = match &err {
        CeremonyError::InvalidUsername | CeremonyError::InvalidSession => StatusCode::BAD_REQUEST,
        CeremonyError::VerificationFailed(_) | CeremonyError::CloneDetected(_) => {
            StatusCode::UNAUTHORIZED
        }
        CeremonyError::DuplicateCredential => StatusCode::CONFLICT,
        CeremonyError::UnknownUser(_) | CeremonyError::Engine(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if let CeremonyError::CloneDetected(_) = &err {
        // Counter values stay in the log
        error_response(status, "Login rejected: possible cloned authenticator")
    } else if err.is_client_error() {
        error_response(status, err.to_string())
    } else {
        tracing::error!("Ceremony failed: {}", err);
        error_response(status, "Internal server error")
    }
}

/// Turns a JSON extraction failure into a 400 with the same error shape.
pub fn json_error(rejection: JsonRejection) -> HandlerError {
    // ---
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    error_response(StatusCode::BAD_REQUEST, "Invalid JSON body")
}

/// Extracts the session token from the `Session-Key` header.
pub fn session_key(headers: &HeaderMap) -> Result<&str, HandlerError> {
    // ---
    let value = headers.get(SESSION_KEY_HEADER).ok_or_else(|| {
        tracing::debug!("Missing Session-Key header");
        error_response(StatusCode::BAD_REQUEST, "Missing Session-Key header")
    })?;

    let token = value.to_str().map_err(|_| {
        tracing::debug!("Invalid Session-Key header encoding");
        error_response(StatusCode::BAD_REQUEST, "Invalid Session-Key header")
    })?;

    if token.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing Session-Key header",
        ));
    }

    Ok(token.trim())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::CloneWarning;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn status_mapping_follows_error_kind() {
        // ---
        let cases = [
            (CeremonyError::InvalidUsername, StatusCode::BAD_REQUEST),
            (CeremonyError::InvalidSession, StatusCode::BAD_REQUEST),
            (
                CeremonyError::VerificationFailed("bad".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (CeremonyError::DuplicateCredential, StatusCode::CONFLICT),
            (
                CeremonyError::UnknownUser(Uuid::new_v4()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CeremonyError::Engine("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = ceremony_error(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn server_errors_hide_detail() {
        // ---
        let (_, Json(body)) = ceremony_error(CeremonyError::Engine("secret detail".into()));
        assert_eq!(body.error, "Internal server error");
    }

    #[test]
    fn clone_detected_hides_counters() {
        // ---
        let warning = CloneWarning {
            user_id: Uuid::new_v4(),
            credential_id: vec![0xab],
            stored_count: 42,
            reported_count: 7,
            authenticator_flagged: false,
        };

        let (status, Json(body)) = ceremony_error(CeremonyError::CloneDetected(warning));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.error.contains("cloned"));
        assert!(!body.error.contains("42"));
        assert!(!body.error.contains("stored"));
    }

    #[test]
    fn session_key_requires_non_blank_header() {
        // ---
        let mut headers = HeaderMap::new();
        assert_eq!(session_key(&headers).unwrap_err().0, StatusCode::BAD_REQUEST);

        headers.insert(SESSION_KEY_HEADER, HeaderValue::from_static("  "));
        assert_eq!(session_key(&headers).unwrap_err().0, StatusCode::BAD_REQUEST);

        headers.insert(SESSION_KEY_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(session_key(&headers).unwrap(), "abc-123");
    }
}
