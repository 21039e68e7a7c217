//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count header rule applications and processed responses
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `render_extras_rules_applied_total` (counter): rule runs by rule, outcome
//! - `render_extras_responses_total` (counter): responses by outcome
//! - `render_extras_upstream_requests_total` (counter): proxied requests by status
//! - `render_extras_upstream_duration_seconds` (histogram): upstream latency
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality (rule names come from configuration)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// One rule ran over a response body.
pub fn record_rule(rule: &str, matches: usize) {
    let outcome = if matches > 0 { "matched" } else { "unmatched" };
    metrics::counter!(
        "render_extras_rules_applied_total",
        "rule" => rule.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// A response went through the header middleware.
pub fn record_response(outcome: &'static str) {
    metrics::counter!("render_extras_responses_total", "outcome" => outcome).increment(1);
}

/// A request was forwarded upstream.
pub fn record_upstream(status: u16, start: Instant) {
    metrics::counter!(
        "render_extras_upstream_requests_total",
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("render_extras_upstream_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}
