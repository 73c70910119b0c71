//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): served requests by method, status
//! - `http_request_duration_seconds` (histogram): handler latency by method
//! - `http_client_retries_total` (counter): outbound retry attempts
//! - `http_client_exhausted_total` (counter): outbound calls that ran out of attempts
//!
//! # Design Decisions
//! - The `metrics` facade is a no-op until an exporter is installed
//! - The Prometheus exporter is opt-in from configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry() {
    metrics::counter!("http_client_retries_total").increment(1);
}

pub fn record_exhausted() {
    metrics::counter!("http_client_exhausted_total").increment(1);
}
