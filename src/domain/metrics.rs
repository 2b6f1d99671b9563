use super::models::CeremonyKind;
use std::sync::Arc;

/// Abstraction for application metrics (counters).
pub trait Metrics: Send + Sync + 'static {
    // ---
    /// Render current metrics in Prometheus text format.
    fn render(&self) -> String;

    /// Record a ceremony entering the begun state.
    fn record_ceremony_started(&self, kind: CeremonyKind);

    /// Record a begin step that failed, labelled like finish results.
    fn record_ceremony_start_failed(&self, kind: CeremonyKind, result: &'static str);

    /// Record a ceremony finish step and its result label ("success", "invalid_session", ...).
    fn record_ceremony_finished(&self, kind: CeremonyKind, result: &'static str);

    /// Record a login that raised a clone warning.
    fn record_clone_warning(&self);
}

/// Type alias for any backend that implements Metrics.
pub type MetricsPtr = Arc<dyn Metrics>;
