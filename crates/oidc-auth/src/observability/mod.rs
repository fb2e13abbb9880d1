//! Observer hooks for authentication attempts.
//!
//! The engine itself does not log decisions. It reports each terminal state
//! as one [`AuthEvent`] to every registered [`AuthObserver`].
//!
//! # Privacy by Default
//!
//! Events carry only bounded, non-identifying fields: the configured service
//! name, the outcome kind, a static reason code and the elapsed time. Token
//! contents and account identifiers never reach an observer.

pub mod metrics;

pub use metrics::MetricsObserver;

use std::time::Duration;

/// Terminal state of an attempt, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    WrongCredentials,
    NeedsReauthentication,
    Failed,
}

impl OutcomeKind {
    /// Label value used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::WrongCredentials => "wrong_credentials",
            OutcomeKind::NeedsReauthentication => "needs_reauthentication",
            OutcomeKind::Failed => "failed",
        }
    }
}

/// One finished authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub service_name: String,
    pub outcome: OutcomeKind,
    /// Static reason code, e.g. `invalid_signature` or `missing_claim`.
    pub reason: &'static str,
    pub elapsed: Duration,
}

/// Receives one event per finished attempt.
///
/// Called inline on the authenticating task; implementations must not block.
pub trait AuthObserver: Send + Sync {
    fn on_event(&self, event: &AuthEvent);
}

/// Structured logging of authentication outcomes.
///
/// Rejected credentials log at warn, reauthentication at info, failures at
/// error and successes at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AuthObserver for TracingObserver {
    fn on_event(&self, event: &AuthEvent) {
        let elapsed_ms = u64::try_from(event.elapsed.as_millis()).unwrap_or(u64::MAX);
        match event.outcome {
            OutcomeKind::Success => tracing::debug!(
                target: "oidc.auth.engine",
                service = %event.service_name,
                elapsed_ms,
                "Authentication succeeded"
            ),
            OutcomeKind::WrongCredentials => tracing::warn!(
                target: "oidc.auth.engine",
                service = %event.service_name,
                reason = event.reason,
                elapsed_ms,
                "Identity token rejected"
            ),
            OutcomeKind::NeedsReauthentication => tracing::info!(
                target: "oidc.auth.engine",
                service = %event.service_name,
                reason = event.reason,
                elapsed_ms,
                "Identity token requires reauthentication"
            ),
            OutcomeKind::Failed => tracing::error!(
                target: "oidc.auth.engine",
                service = %event.service_name,
                reason = event.reason,
                elapsed_ms,
                "Authentication failed"
            ),
        }
    }
}
