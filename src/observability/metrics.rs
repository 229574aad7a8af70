//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency by route
//! - `proxy_rejected_total` (counter): requests refused before forwarding, by route and stage
//! - `proxy_config_reloads_total` (counter): reload attempts by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels never carry template output or identity values

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!("proxy_requests_total", "Total proxied requests");
            describe_histogram!("proxy_request_duration_seconds", "Request duration in seconds");
            describe_counter!("proxy_rejected_total", "Requests refused before reaching an upstream");
            describe_counter!("proxy_config_reloads_total", "Configuration reload attempts");
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Count a request refused before forwarding; `stage` is e.g. `auth` or `headers`.
pub fn record_rejected(route: &str, stage: &'static str) {
    counter!("proxy_rejected_total", "route" => route.to_string(), "stage" => stage).increment(1);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("proxy_config_reloads_total", "outcome" => outcome).increment(1);
}
