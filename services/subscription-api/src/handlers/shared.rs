//! Shared handler utilities
//!
//! Metrics helpers used across handlers so every operation reports under the
//! same names and labels.

use std::time::Instant;

use crate::error::ApiResult;

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "lifecycle_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an operation error without duration
#[inline]
pub fn record_op_error(operation: &'static str) {
    metrics::counter!(
        "lifecycle_operation_errors_total",
        "operation" => operation
    )
    .increment(1);
}

/// Time a handler result and count its failure
pub fn observe<T>(operation: &'static str, start: Instant, result: ApiResult<T>) -> ApiResult<T> {
    record_op_duration(operation, start, result.is_ok());
    if result.is_err() {
        record_op_error(operation);
    }
    result
}
