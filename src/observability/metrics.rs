//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, route, status
//! - `relay_request_duration_seconds` (histogram): end-to-end latency
//! - `relay_downstream_calls_total` (counter): downstream calls by endpoint, outcome
//! - `relay_downstream_duration_seconds` (histogram): downstream latency
//! - `relay_artifacts_in_flight` (gauge): transient upload files on disk
//! - `relay_artifact_cleanup_total` (counter): artifact removals by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Route label is the matched route template, never the raw path

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

const UNMATCHED_ROUTE: &str = "unmatched";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: String, route: String, status: u16, start: Instant) {
    ::metrics::counter!(
        "relay_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "relay_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_downstream(endpoint: &'static str, outcome: &'static str, start: Instant) {
    ::metrics::counter!(
        "relay_downstream_calls_total",
        "endpoint" => endpoint,
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("relay_downstream_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn artifact_created() {
    ::metrics::gauge!("relay_artifacts_in_flight").increment(1.0);
}

/// `outcome` is one of `removed`, `dropped` or `leaked`.
pub fn artifact_released(outcome: &'static str) {
    ::metrics::gauge!("relay_artifacts_in_flight").decrement(1.0);
    ::metrics::counter!("relay_artifact_cleanup_total", "outcome" => outcome).increment(1);
}

/// Middleware recording request count and latency per route.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let response = next.run(request).await;
    record_request(method, route, response.status().as_u16(), start);
    response
}
