//! Application state management.
//!
//! This module defines the shared state structure that gets passed to all
//! Axum handlers via the `State` extractor. The `AppState` holds the ceremony
//! service and the metrics implementation.
//!
//! The state is cheaply cloneable (`Arc` internally) so it can be passed to
//! each request handler without copying the underlying stores.

use crate::ceremony::CeremonyServicePtr;
use crate::domain::MetricsPtr;

/// Shared application state passed to all Axum handlers.
///
/// # Lifecycle
///
/// 1. Created once in `build_router()` during application startup
/// 2. Attached to the Axum router via `.with_state(app_state)`
/// 3. Cloned automatically by Axum for each incoming HTTP request
/// 4. Handlers extract via `State(state): State<AppState>`
#[derive(Clone)]
pub(crate) struct AppState {
    /// Ceremony orchestrator over the directory, session store and engine.
    ceremony: CeremonyServicePtr,

    /// Metrics implementation for recording application events.
    ///
    /// Either Prometheus-backed (production) or no-op (testing/development).
    metrics: MetricsPtr,
}

impl AppState {
    // ---

    pub fn new(ceremony: CeremonyServicePtr, metrics: MetricsPtr) -> Self {
        // ---
        AppState { ceremony, metrics }
    }

    /// Get a reference to the ceremony service.
    pub(crate) fn ceremony(&self) -> &CeremonyServicePtr {
        // ---
        &self.ceremony
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        // ---
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    // ---

    use super::*;
    use crate::ceremony::CeremonyService;
    use crate::config::WebAuthnConfig;
    use crate::domain::ClonePolicy;
    use crate::infrastructure::{
        create_in_memory_directory, create_in_memory_sessions, create_noop_metrics, WebauthnEngine,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn test_webauthn_config() -> WebAuthnConfig {
        // ---
        WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Test App".to_string(),
            origin: "http://localhost:8080".to_string(),
        }
    }

    #[tokio::test]
    async fn test_app_state_creation_and_clone() {
        // ---
        let ttl = Duration::from_secs(300);
        let metrics = create_noop_metrics().unwrap();
        let engine = Arc::new(WebauthnEngine::from_config(&test_webauthn_config(), ttl).unwrap());
        let service = Arc::new(CeremonyService::new(
            create_in_memory_directory(),
            create_in_memory_sessions(ttl),
            engine,
            metrics.clone(),
            ClonePolicy::Warn,
        ));

        let app_state = AppState::new(service, metrics);
        let cloned = app_state.clone();

        // Clones share the same service
        assert!(Arc::ptr_eq(app_state.ceremony(), cloned.ceremony()));
        assert_eq!(cloned.ceremony().clone_policy(), ClonePolicy::Warn);
        assert_eq!(cloned.ceremony().sessions().pending().await, 0);
        assert!(app_state.metrics().render().is_empty());
    }
}
