mod counters;
mod prometheus_metrics;
mod recorder;

pub use prometheus_metrics::PrometheusMetrics;
use std::sync::Arc;

// Re-export utilities for internal use within this module
pub(crate) use counters::{
    increment_ceremony_finished, increment_ceremony_start_failed, increment_ceremony_started,
    increment_clone_warning,
};
pub(crate) use recorder::{init_metrics, render_metrics};

/// Creates a new Prometheus metrics implementation.
///
/// Installs the global recorder on first use; the rendered text is served
/// from the `/metrics` endpoint for scraping.
pub fn create() -> anyhow::Result<crate::domain::MetricsPtr> {
    tracing::info!("Initializing Prometheus metrics");
    init_metrics()?;

    Ok(Arc::new(PrometheusMetrics::new()))
}
