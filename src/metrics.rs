//! Metrics for observability.
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding process installs a recorder.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `couch_replication_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration)

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record the size of the candidate set after filtering.
pub fn record_candidates(count: usize) {
    gauge!("couch_replication_candidates").set(count as f64);
}

/// Record databases skipped because an active replication covers them.
pub fn record_coverage(kind: &str, count: usize) {
    counter!("couch_replication_covered_total", "kind" => kind.to_string()).increment(count as u64);
}

/// Record a `_replicator` document that matched no known shape.
pub fn record_malformed_document() {
    counter!("couch_replication_malformed_documents_total").increment(1);
}

/// Record a dispatched replication task.
pub fn record_dispatch(mode: &str) {
    counter!("couch_replication_dispatched_total", "mode" => mode.to_string()).increment(1);
}

/// Record CouchDB request latency by operation.
pub fn record_request_latency(operation: &str, duration: Duration) {
    histogram!(
        "couch_replication_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record errors by type.
pub fn record_error(error_type: &str) {
    counter!("couch_replication_errors_total", "error_type" => error_type.to_string()).increment(1);
}

/// Gauge for the run phase.
pub fn set_run_phase(phase: &str) {
    let value = match phase {
        "Created" => 0.0,
        "Planning" => 1.0,
        "Dispatching" => 2.0,
        "Completed" => 3.0,
        "Failed" => 4.0,
        _ => -1.0,
    };
    gauge!("couch_replication_run_phase").set(value);
}
