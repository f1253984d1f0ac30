//! Metrics definitions for the auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `op`: the eight credential operations
//! - `outcome`: `success` or an error label from `AuthError::metric_label`
//! - `kind`: `access`, `refresh`
//! - `outcome` (mail): `sent`, `failed`, `dropped`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return the handle that
/// renders `/metrics`.
///
/// # Errors
///
/// Returns error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Operation latency is dominated by bcrypt (tens to hundreds of ms)
        .set_buckets_for_metric(
            Matcher::Prefix("auth_operation".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.350, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set operation buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("auth_bcrypt_duration_seconds".to_string()),
            &[0.050, 0.100, 0.200, 0.400, 0.800, 1.600],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a finished credential operation.
///
/// Metric: `auth_operations_total`, `auth_operation_duration_seconds`
/// Labels: `op`, `outcome`
pub fn record_operation(op: &'static str, outcome: &'static str, duration: Duration) {
    histogram!("auth_operation_duration_seconds", "op" => op).record(duration.as_secs_f64());
    counter!("auth_operations_total", "op" => op, "outcome" => outcome).increment(1);
}

/// Record an issued token.
///
/// Metric: `auth_tokens_issued_total`
/// Labels: `kind`
pub fn record_token_issued(kind: &'static str) {
    counter!("auth_tokens_issued_total", "kind" => kind).increment(1);
}

/// Record the fate of a queued email.
///
/// Metric: `auth_mail_dispatch_total`
/// Labels: `outcome`
pub fn record_mail_dispatch(outcome: &'static str) {
    counter!("auth_mail_dispatch_total", "outcome" => outcome).increment(1);
}

/// Record bcrypt operation duration.
///
/// Metric: `auth_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify)
pub fn record_bcrypt_duration(operation: &'static str, duration: Duration) {
    histogram!("auth_bcrypt_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}
