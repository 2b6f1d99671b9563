//! Prometheus metrics implementation.
//!
//! This module provides a concrete implementation of the `Metrics` trait using
//! the Prometheus metrics format. It delegates to utility functions in sibling
//! modules (`counters.rs`, `recorder.rs`) which handle the actual metrics
//! collection via the global `metrics` crate registry.

use crate::domain::{CeremonyKind, Metrics};

/// Prometheus-based metrics implementation.
///
/// This struct is empty because we use the global metrics registry pattern
/// via the `metrics` crate. Counters are registered on first use with the
/// `counter!()` macro, and the global PrometheusHandle stored in
/// `recorder.rs` renders them.
#[derive(Default)]
pub struct PrometheusMetrics {
    // Empty - uses global metrics registry pattern
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics {}
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_ceremony_started(&self, kind: CeremonyKind) {
        tracing::debug!("Recording {} ceremony started", kind);
        super::increment_ceremony_started(kind);
    }

    fn record_ceremony_start_failed(&self, kind: CeremonyKind, result: &'static str) {
        tracing::debug!("Recording {} ceremony start failure: {}", kind, result);
        super::increment_ceremony_start_failed(kind, result);
    }

    fn record_ceremony_finished(&self, kind: CeremonyKind, result: &'static str) {
        tracing::debug!("Recording {} ceremony finished: {}", kind, result);
        super::increment_ceremony_finished(kind, result);
    }

    fn record_clone_warning(&self) {
        super::increment_clone_warning();
    }
}
