//! Metrics collection and exposition.
//!
//! # Metrics
//! - `middleware_errors_captured_total` (counter): failures captured, by error kind
//! - `middleware_events_submitted_total` (counter): events accepted by the monitor
//! - `middleware_event_submit_failures_total` (counter): events that could not be submitted
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_error_captured(kind: &str) {
    metrics::counter!("middleware_errors_captured_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_event_submitted() {
    metrics::counter!("middleware_events_submitted_total").increment(1);
}

pub fn record_submit_failure() {
    metrics::counter!("middleware_event_submit_failures_total").increment(1);
}
