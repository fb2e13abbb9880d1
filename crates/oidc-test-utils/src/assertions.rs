//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for authentication outcomes.

use oidc_auth::{
    AuthenticationOutcome, OutcomeKind, Principal, ReauthenticationReason, RejectionReason,
};

/// Custom assertions for authentication outcomes
///
/// # Example
/// ```rust,ignore
/// outcome
///     .assert_success()
///     .assert_identity("alice")
///     .assert_has_role("Acme:Viewer");
/// ```
pub trait OutcomeAssertions {
    /// Assert that the attempt succeeded
    fn assert_success(&self) -> &Self;

    /// Assert the authenticated identity
    fn assert_identity(&self, identity: &str) -> &Self;

    /// Assert the principal holds a role
    fn assert_has_role(&self, role_identifier: &str) -> &Self;

    /// Assert the token was rejected for the given reason
    fn assert_wrong_credentials(&self, reason: RejectionReason) -> &Self;

    /// Assert reauthentication is required for the given reason
    fn assert_needs_reauthentication(&self, reason: ReauthenticationReason) -> &Self;

    /// Assert a hard failure with the given reason code
    fn assert_failed_with(&self, reason_code: &str) -> &Self;
}

fn expect_principal(outcome: &AuthenticationOutcome) -> &Principal {
    match outcome.principal() {
        Some(principal) => principal,
        None => panic!(
            "Expected successful authentication, got {:?} ({})",
            outcome.kind(),
            outcome.reason_code()
        ),
    }
}

impl OutcomeAssertions for AuthenticationOutcome {
    fn assert_success(&self) -> &Self {
        expect_principal(self);
        self
    }

    fn assert_identity(&self, identity: &str) -> &Self {
        let principal = expect_principal(self);
        assert_eq!(
            principal.identity(),
            identity,
            "Expected identity '{}', got '{}'",
            identity,
            principal.identity()
        );
        self
    }

    fn assert_has_role(&self, role_identifier: &str) -> &Self {
        let principal = expect_principal(self);
        assert!(
            principal.has_role(role_identifier),
            "Principal does not hold role '{}'. Roles: {:?}",
            role_identifier,
            principal.roles()
        );
        self
    }

    fn assert_wrong_credentials(&self, reason: RejectionReason) -> &Self {
        match self {
            AuthenticationOutcome::WrongCredentials(actual) => assert_eq!(
                *actual, reason,
                "Expected rejection {:?}, got {:?}",
                reason, actual
            ),
            other => panic!(
                "Expected WrongCredentials({:?}), got {:?} ({})",
                reason,
                other.kind(),
                other.reason_code()
            ),
        }
        self
    }

    fn assert_needs_reauthentication(&self, reason: ReauthenticationReason) -> &Self {
        match self {
            AuthenticationOutcome::NeedsReauthentication(actual) => assert_eq!(
                *actual, reason,
                "Expected reauthentication {:?}, got {:?}",
                reason, actual
            ),
            other => panic!(
                "Expected NeedsReauthentication({:?}), got {:?} ({})",
                reason,
                other.kind(),
                other.reason_code()
            ),
        }
        self
    }

    fn assert_failed_with(&self, reason_code: &str) -> &Self {
        assert_eq!(
            self.kind(),
            OutcomeKind::Failed,
            "Expected a failed outcome, got {:?} ({})",
            self.kind(),
            self.reason_code()
        );
        assert_eq!(
            self.reason_code(),
            reason_code,
            "Expected failure '{}', got '{}'",
            reason_code,
            self.reason_code()
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidc_auth::AuthError;

    #[test]
    fn test_assert_wrong_credentials() {
        AuthenticationOutcome::WrongCredentials(RejectionReason::InvalidSignature)
            .assert_wrong_credentials(RejectionReason::InvalidSignature);
    }

    #[test]
    #[should_panic(expected = "Expected successful authentication")]
    fn test_assert_success_on_rejection() {
        AuthenticationOutcome::WrongCredentials(RejectionReason::MalformedToken).assert_success();
    }

    #[test]
    fn test_assert_failed_with() {
        AuthenticationOutcome::Failed(AuthError::MissingClaim {
            claim: "sub".to_string(),
        })
        .assert_failed_with("missing_claim");
    }

    #[test]
    #[should_panic(expected = "Expected NeedsReauthentication")]
    fn test_assert_needs_reauthentication_on_failure() {
        AuthenticationOutcome::Failed(AuthError::UnsupportedAttempt("x".to_string()))
            .assert_needs_reauthentication(ReauthenticationReason::Expired);
    }
}
