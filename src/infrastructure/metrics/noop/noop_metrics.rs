use crate::domain::{CeremonyKind, Metrics};

/// No-op metrics implementation for testing.
#[derive(Default)]
pub struct NoopMetrics;

impl NoopMetrics {
    pub fn new() -> Self {
        NoopMetrics
    }
}

impl Metrics for NoopMetrics {
    // ---
    fn render(&self) -> String {
        String::new()
    }
    fn record_ceremony_started(&self, _: CeremonyKind) {}
    fn record_ceremony_start_failed(&self, _: CeremonyKind, _: &'static str) {}
    fn record_ceremony_finished(&self, _: CeremonyKind, _: &'static str) {}
    fn record_clone_warning(&self) {}
}
