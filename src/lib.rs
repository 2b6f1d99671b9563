// src/lib.rs
use anyhow::Result;
use app_state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use domain::MetricsPtr;
use handlers::{
    health_check, login_finish, login_start, metrics_handler, register_finish, register_start,
    root_handler,
};

// Public exports (visible outside this module)
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod ceremony;
mod config;
mod handlers;
mod infrastructure;

// Hoist up only the public symbol(s)
pub use ceremony::{CeremonyService, CeremonyServicePtr};
pub use handlers::SESSION_KEY_HEADER;

pub use config::*;

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    create_in_memory_directory, // ---
    create_in_memory_sessions,
    create_noop_metrics,
    create_prom_metrics,
    create_webauthn,
    spawn_session_sweeper,
    InMemoryDirectory,
    InMemorySessionStore,
    ManualClock,
    SystemClock,
    WebauthnEngine,
};

/// Build the HTTP router from environment configuration.
///
/// Wires the in-memory directory and session store to the WebAuthn engine
/// and starts the session sweeper, so this must be called from within a
/// Tokio runtime.
pub fn create_router() -> Result<Router> {
    // ---
    // Load all configuration from environment
    let config = AppConfig::from_env()?;

    let metrics = if config.metrics.prometheus {
        create_prom_metrics()?
    } else {
        create_noop_metrics()?
    };

    tracing_subscriber::fmt::try_init().ok(); // Ignores if already initialized

    // Create infrastructure dependencies
    let directory = create_in_memory_directory();
    let sessions = create_in_memory_sessions(config.ceremony.ttl);
    let engine = Arc::new(WebauthnEngine::from_config(
        &config.webauthn,
        config.ceremony.ttl,
    )?);

    spawn_session_sweeper(sessions.clone(), config.ceremony.sweep_interval);

    let service = Arc::new(CeremonyService::new(
        directory,
        sessions,
        engine,
        metrics.clone(),
        config.ceremony.clone_policy,
    ));

    tracing::info!(
        "Ceremony service ready (rp_id: {}, ttl: {:?}, clone policy: {:?})",
        config.webauthn.rp_id,
        config.ceremony.ttl,
        config.ceremony.clone_policy
    );

    Ok(build_router(service, metrics))
}

/// Build the HTTP router around an already-wired ceremony service.
pub fn build_router(ceremony: CeremonyServicePtr, metrics: MetricsPtr) -> Router {
    // ---
    let app_state = AppState::new(ceremony, metrics);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/register/start", post(register_start))
        .route("/register/finish", post(register_finish))
        .route("/login/start", post(login_start))
        .route("/login/finish", post(login_finish))
        .with_state(app_state)
}
