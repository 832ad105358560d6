//! Prometheus metrics.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reasoner_core::{Error, Result};

/// Install the Prometheus recorder and return the render handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Record one served HTTP request.
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "reasoner_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "reasoner_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Record a query accepted by the service.
pub fn track_submission() {
    metrics::counter!("reasoner_submissions_total").increment(1);
}

/// Record a task leaving the dispatcher, by capability and final status.
pub fn track_task(capability: &str, status: &str) {
    metrics::counter!(
        "reasoner_tasks_total",
        "capability" => capability.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a finished controller run.
pub fn track_run(finish_reason: &'static str, iterations: u32) {
    metrics::counter!("reasoner_runs_total", "finish_reason" => finish_reason).increment(1);
    metrics::histogram!("reasoner_run_iterations").record(f64::from(iterations));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_renders_tracked_requests() {
        let handle = setup_metrics_recorder().unwrap();
        track_request("GET", "/health", 200, 0.002);
        track_submission();
        track_task("Math", "succeeded");
        track_run("solved", 2);

        let rendered = handle.render();
        assert!(rendered.contains("reasoner_http_requests_total"));
        assert!(rendered.contains("path=\"/health\""));
        assert!(rendered.contains("reasoner_submissions_total 1"));
        assert!(rendered.contains("capability=\"Math\""));
        assert!(rendered.contains("finish_reason=\"solved\""));
        assert!(rendered.contains("reasoner_run_iterations"));

        // Only one global recorder per process.
        assert!(setup_metrics_recorder().is_err());
    }
}
