//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_rate_limited_total` (counter): denials by policy
//! - `guard_block_events_total` (counter): explicit block/unblock operations
//! - `guard_signature_failures_total` (counter): rejected signatures by kind
//! - `guard_swept_records_total` (counter): records removed by the janitor

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %e, "Failed to install Prometheus exporter");
        return;
    }

    describe_counter!(
        "guard_rate_limited_total",
        "Requests denied by the rate limiter, labeled by policy"
    );
    describe_counter!(
        "guard_block_events_total",
        "Explicit block and unblock operations"
    );
    describe_counter!(
        "guard_signature_failures_total",
        "Rejected payment and webhook signatures, labeled by kind"
    );
    describe_counter!(
        "guard_swept_records_total",
        "Expired limiter records removed by the janitor"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_rate_limited(policy: &str) {
    counter!("guard_rate_limited_total", "policy" => policy.to_string()).increment(1);
}

pub fn record_block_event(op: &'static str) {
    counter!("guard_block_events_total", "op" => op).increment(1);
}

pub fn record_signature_failure(kind: &'static str) {
    counter!("guard_signature_failures_total", "kind" => kind).increment(1);
}

pub fn record_sweep(removed: usize) {
    counter!("guard_swept_records_total").increment(removed as u64);
}
