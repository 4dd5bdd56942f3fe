//! Metrics collection.
//!
//! # Metrics
//! - `timed_request_attempts_total` (counter): exchanges sent
//! - `timed_request_timeouts_total` (counter): supervisor timeouts by `kind`
//! - `timed_request_duration_seconds` (histogram): exchange latency by `outcome`
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use std::time::Duration;

use crate::supervisor::TimeoutKind;
use crate::transport::FetchError;

pub fn record_attempt() {
    metrics::counter!("timed_request_attempts_total").increment(1);
}

pub fn record_timeout(kind: TimeoutKind) {
    metrics::counter!("timed_request_timeouts_total", "kind" => kind.code()).increment(1);
}

/// Record a finished exchange; `error` is `None` once the body was read in full.
pub fn record_outcome(error: Option<&FetchError>, elapsed: Duration) {
    let label = error.map_or("ok", FetchError::code);
    metrics::histogram!("timed_request_duration_seconds", "outcome" => label)
        .record(elapsed.as_secs_f64());
}
