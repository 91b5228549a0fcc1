//! Prometheus metric recorders.
//!
//! Thin wrappers over the `metrics` macros so handlers record consistent
//! names and labels. Exposition lives at `GET /metrics`.

use metrics::{counter, histogram};
use std::time::Instant;

/// Count a served request by content category and response status.
pub fn record_request(category: &'static str, status: u16) {
    counter!(
        "hlsgate_requests_total",
        "category" => category,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record end-to-end handler latency for a content category.
pub fn record_duration(category: &'static str, start: Instant) {
    histogram!("hlsgate_request_duration_seconds", "category" => category)
        .record(start.elapsed().as_secs_f64());
}

/// Count upstream fetches that failed after all retries.
pub fn record_origin_error() {
    counter!("hlsgate_origin_errors_total").increment(1);
}

/// Count individual retry attempts against the origin.
pub fn record_retry() {
    counter!("hlsgate_upstream_retries_total").increment(1);
}
