use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_sessions: Option<usize>,
}

#[derive(Deserialize)]
pub struct HealthQuery {
    mode: Option<String>,
}

/// Responds with the health status of the server.
///
/// - By default (no query parameters), performs a light check to confirm the web server
///   is running.
///
/// - If `mode=full` is passed as a query parameter, also reports how many
///   ceremonies are waiting for their finish step.
///
/// # Query Parameters
/// - `mode`: Optional. Accepts `"light"` (default) or `"full"`.
///
/// # Examples
/// - `GET /health` → 200 OK `{ "status": "ok" }`
/// - `GET /health?mode=full` → 200 OK `{ "status": "ok", "pending_sessions": 3 }`
pub async fn health_check(
    State(state): State<AppState>,
    Query(params): Query<HealthQuery>,
) -> (StatusCode, Json<HealthResponse>) {
    let pending_sessions = match params.mode.as_deref() {
        Some("full") => Some(state.ceremony().sessions().pending().await),
        _ => None,
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            pending_sessions,
        }),
    )
}
