//! Metrics collection and exposition.
//!
//! # Metrics
//! - `front_requests_total` (counter): HTTP responses by method, status
//! - `front_request_duration_seconds` (histogram): time to response headers
//! - `front_upgrades_total` (counter): upgrade requests by outcome
//! - `front_active_connections` (gauge): connections the server still owns
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "front_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("front_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record how an upgrade request was routed.
pub fn record_upgrade(outcome: &'static str) {
    counter!("front_upgrades_total", "outcome" => outcome).increment(1);
}

pub fn connection_opened() {
    gauge!("front_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("front_active_connections").decrement(1.0);
}
