//! Request metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! application installs a recorder.
//!
//! - `courier_requests_total{outcome}`: calls by outcome
//! - `courier_request_duration_seconds{outcome}`: time from `start` to the
//!   terminal event, absent for calls canceled in `before`
//! - `courier_extensions_initialized_total`: extensions initialized

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;
use std::time::Duration;

/// Counter of finished calls
pub const REQUESTS_TOTAL: &str = "courier_requests_total";
/// Histogram of in-flight durations
pub const REQUEST_DURATION_SECONDS: &str = "courier_request_duration_seconds";
/// Counter of initialized extensions
pub const EXTENSIONS_INITIALIZED_TOTAL: &str = "courier_extensions_initialized_total";

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `success` was emitted
    Success,
    /// `error` was emitted
    Error,
    /// `abort` was emitted
    Abort,
    /// `before` was canceled
    Canceled,
}

impl Outcome {
    /// Label value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Abort => "abort",
            Self::Canceled => "canceled",
        }
    }
}

static DESCRIBE: Once = Once::new();

/// Register metric descriptions with the installed recorder.
pub fn register_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(REQUESTS_TOTAL, "Total number of request calls by outcome");
        describe_histogram!(
            REQUEST_DURATION_SECONDS,
            "Time from issuing a transfer to its terminal event"
        );
        describe_counter!(
            EXTENSIONS_INITIALIZED_TOTAL,
            "Total number of extensions initialized"
        );
    });
}

/// Record a finished call.
pub fn record(outcome: Outcome, elapsed: Option<Duration>) {
    register_metrics();
    counter!(REQUESTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    if let Some(elapsed) = elapsed {
        histogram!(REQUEST_DURATION_SECONDS, "outcome" => outcome.as_str())
            .record(elapsed.as_secs_f64());
    }
}

/// Record an extension initialization.
pub fn record_extension_initialized() {
    counter!(EXTENSIONS_INITIALIZED_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        let labels: Vec<&str> = [Outcome::Success, Outcome::Error, Outcome::Abort, Outcome::Canceled]
            .into_iter()
            .map(Outcome::as_str)
            .collect();
        assert_eq!(labels, vec!["success", "error", "abort", "canceled"]);
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record(Outcome::Success, Some(Duration::from_millis(5)));
        record(Outcome::Canceled, None);
        record_extension_initialized();
    }
}
