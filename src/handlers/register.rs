//! Passkey registration handlers.
//!
//! Implements the two-phase registration flow:
//! 1. `register_start` - Generate challenge and return credential creation options
//! 2. `register_finish` - Verify the attestation and store the credential

use super::shared_types::{
    ceremony_error, error_response, json_error, session_key, HandlerError, StartRequest,
    StartResponse, SESSION_KEY_HEADER,
};
use crate::app_state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RegistrationFinishResponse {
    // ---
    pub success: bool,
    pub credential_id: String,
}

// ============================================================================
// Registration Start Handler
// ============================================================================

/// POST /register/start
///
/// Initiates passkey registration. The session token needed by the finish
/// step is returned in the `Session-Key` response header.
///
/// # Request Body
/// ```json
/// { "username": "user@example.com" }
/// ```
///
/// # Response
/// `{ "options": { "publicKey": { ... } } }` for `navigator.credentials.create()`.
pub async fn register_start(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<StartResponse>), HandlerError> {
    // ---
    let Json(req) = body.map_err(json_error)?;

    let start = state
        .ceremony()
        .begin_registration(&req.username)
        .await
        .map_err(ceremony_error)?;

    let headers = session_header(&start.token)?;

    Ok((
        headers,
        Json(StartResponse {
            options: start.options,
        }),
    ))
}

// ============================================================================
// Registration Finish Handler
// ============================================================================

/// POST /register/finish
///
/// Verifies the attestation produced by the authenticator and stores the
/// resulting credential. The body is the client's credential JSON as-is.
///
/// # Response
/// `{ "success": true, "credential_id": "<hex>" }`
pub async fn register_finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<RegistrationFinishResponse>, HandlerError> {
    // ---
    let token = session_key(&headers)?;
    let Json(response) = body.map_err(json_error)?;

    let outcome = state
        .ceremony()
        .finish_registration(token, &response)
        .await
        .map_err(ceremony_error)?;

    Ok(Json(RegistrationFinishResponse {
        success: true,
        credential_id: hex::encode(outcome.credential_id),
    }))
}

/// Response headers carrying a freshly issued session token.
pub(super) fn session_header(token: &str) -> Result<HeaderMap, HandlerError> {
    // ---
    let value = HeaderValue::from_str(token).map_err(|e| {
        tracing::error!("Session token is not a valid header value: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(SESSION_KEY_HEADER, value);
    Ok(headers)
}
