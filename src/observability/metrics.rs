//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): completed pipelines by method, status
//! - `dispatch_request_duration_seconds` (histogram): pipeline latency by method
//! - `dispatch_stage_failures_total` (counter): contained failures by stage

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished pipeline.
pub fn record_dispatch(method: &str, status: u16, elapsed: Duration) {
    counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("dispatch_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_stage_failure(stage: &'static str) {
    counter!("dispatch_stage_failures_total", "stage" => stage).increment(1);
}
