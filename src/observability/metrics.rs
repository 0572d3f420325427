//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): requests by method, route, status
//! - `switchyard_request_duration_seconds` (histogram): latency by method, route
//! - `switchyard_unhandled_faults_total` (counter): handler errors and panics by route
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Route labels are templates (`/chat/:chatId`), never concrete paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, started: Instant) {
    ::metrics::counter!(
        "switchyard_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "switchyard_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_unhandled(route: &str) {
    ::metrics::counter!("switchyard_unhandled_faults_total", "route" => route.to_string()).increment(1);
}
