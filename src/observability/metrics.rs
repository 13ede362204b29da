//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gated_proxy_requests_total` (counter): requests by method, status, outcome
//! - `gated_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `gated_proxy_rejections_total` (counter): auth rejections by reason
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("outcome", outcome.to_string()),
    ];
    metrics::counter!("gated_proxy_requests_total", &labels).increment(1);
    metrics::histogram!("gated_proxy_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request turned away by the access gate.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("gated_proxy_rejections_total", "reason" => reason).increment(1);
}
