//! Passkey login handlers.
//!
//! Implements the two-phase login flow:
//! 1. `login_start` - Generate challenge and return credential request options
//! 2. `login_finish` - Verify the assertion and advance the signature counter

use super::register::session_header;
use super::shared_types::{
    ceremony_error, json_error, session_key, HandlerError, StartRequest, StartResponse,
};
use crate::app_state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LoginFinishResponse {
    // ---
    pub success: bool,
    /// Set when the clone policy let a suspicious login through. Counter
    /// details are logged, not returned.
    pub clone_warning: bool,
}

// ============================================================================
// Login Start Handler
// ============================================================================

/// POST /login/start
///
/// Generates a login challenge. Unregistered usernames receive options of
/// the same shape as registered ones.
///
/// # Request Body
/// ```json
/// { "username": "user@example.com" }
/// ```
pub async fn login_start(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<StartResponse>), HandlerError> {
    // ---
    let Json(req) = body.map_err(json_error)?;

    let start = state
        .ceremony()
        .begin_login(&req.username)
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
// Login Finish Handler
// ============================================================================

/// POST /login/finish
///
/// Verifies the assertion for the session named by `Session-Key`.
///
/// # Response
/// `{ "success": true, "clone_warning": false }`; `clone_warning` is `true`
/// when the `warn` clone policy admitted a suspicious login.
pub async fn login_finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<LoginFinishResponse>, HandlerError> {
    // ---
    let token = session_key(&headers)?;
    let Json(response) = body.map_err(json_error)?;

    let outcome = state
        .ceremony()
        .finish_login(token, &response)
        .await
        .map_err(ceremony_error)?;

    Ok(Json(LoginFinishResponse {
        success: true,
        clone_warning: outcome.warning.is_some(),
    }))
}
