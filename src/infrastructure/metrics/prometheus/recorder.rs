use anyhow::{anyhow, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus recorder globally and store the handle.
///
/// Safe to call more than once; only the first call installs a recorder.
pub fn init_metrics() -> Result<()> {
    if HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow!("failed to install Prometheus recorder: {e}"))?;

    HANDLE
        .set(handle)
        .map_err(|_| anyhow!("metrics recorder already initialized"))
}

/// Render the current metrics in Prometheus text format.
pub fn render_metrics() -> String {
    HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
