//! Metrics for identity-token authentication.
//!
//! All metrics follow Prometheus naming conventions:
//! - `oidc_auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 4 values (success, wrong_credentials, needs_reauthentication, failed)
//! - `reason`: bounded by the engine's static reason codes
//!
//! The service name is deliberately not a label; run one engine per service
//! and scope metrics at the exporter.

use super::{AuthEvent, AuthObserver};
use metrics::{counter, histogram};
use std::time::Duration;

/// Record a finished authentication attempt.
///
/// Metric: `oidc_auth_attempts_total`, `oidc_auth_duration_seconds`
/// Labels: `outcome`, `reason`
pub fn record_auth_attempt(outcome: &'static str, reason: &'static str, duration: Duration) {
    histogram!("oidc_auth_duration_seconds",
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());

    counter!("oidc_auth_attempts_total",
        "outcome" => outcome,
        "reason" => reason
    )
    .increment(1);
}

/// Observer that records every attempt via [`record_auth_attempt`].
///
/// Records into whatever `metrics` recorder the application installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl AuthObserver for MetricsObserver {
    fn on_event(&self, event: &AuthEvent) {
        record_auth_attempt(event.outcome.as_str(), event.reason, event.elapsed);
    }
}
