//! Authentication decision engine.
//!
//! Turns one authentication attempt into exactly one
//! [`AuthenticationOutcome`]. The pipeline is strictly linear and stops at
//! the first terminal state:
//!
//! ```text
//! attempt type -> transport -> key set -> parse -> signature -> expiry
//!              -> account identifier -> principal
//! ```
//!
//! The engine holds no per-attempt state and never retries. A single engine
//! can serve any number of concurrent attempts.

use crate::auth::jwks::KeySetProvider;
use crate::auth::token::IdentityToken;
use crate::config::{AuthConfig, ConfigError};
use crate::errors::AuthError;
use crate::observability::{AuthEvent, AuthObserver, OutcomeKind, TracingObserver};
use crate::principal::{CredentialSource, Principal, PrincipalFactory, RoleResolver};
use crate::transport::TokenTransport;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// What the caller is trying to authenticate with.
#[derive(Clone, Copy)]
pub enum AuthAttempt<'a> {
    /// An identity token read from the given transport.
    IdentityToken(&'a dyn TokenTransport),

    /// Any other credential type. Always fails as unsupported.
    Other { kind: &'a str },
}

impl fmt::Debug for AuthAttempt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthAttempt::IdentityToken(_) => f.write_str("IdentityToken"),
            AuthAttempt::Other { kind } => f.debug_struct("Other").field("kind", kind).finish(),
        }
    }
}

/// Why a token was rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    MalformedToken,
    InvalidSignature,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::MalformedToken => "malformed_token",
            RejectionReason::InvalidSignature => "invalid_signature",
        }
    }
}

/// Why a genuine token cannot be accepted any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthenticationReason {
    Expired,
    MissingExpiry,
}

impl ReauthenticationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ReauthenticationReason::Expired => "expired",
            ReauthenticationReason::MissingExpiry => "missing_expiry",
        }
    }
}

/// Result of one authentication attempt.
#[derive(Debug)]
pub enum AuthenticationOutcome {
    Success(Principal),
    WrongCredentials(RejectionReason),
    NeedsReauthentication(ReauthenticationReason),
    Failed(AuthError),
}

impl AuthenticationOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AuthenticationOutcome::Success(_) => OutcomeKind::Success,
            AuthenticationOutcome::WrongCredentials(_) => OutcomeKind::WrongCredentials,
            AuthenticationOutcome::NeedsReauthentication(_) => OutcomeKind::NeedsReauthentication,
            AuthenticationOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// Bounded reason code; `"none"` for success.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthenticationOutcome::Success(_) => "none",
            AuthenticationOutcome::WrongCredentials(reason) => reason.as_str(),
            AuthenticationOutcome::NeedsReauthentication(reason) => reason.as_str(),
            AuthenticationOutcome::Failed(err) => err.reason_code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthenticationOutcome::Success(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthenticationOutcome::Success(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn into_principal(self) -> Option<Principal> {
        match self {
            AuthenticationOutcome::Success(principal) => Some(principal),
            _ => None,
        }
    }
}

/// Identity-token authentication for one configured service.
pub struct AuthenticationEngine {
    config: AuthConfig,
    key_set_provider: Arc<dyn KeySetProvider>,
    principal_factory: PrincipalFactory,
    observers: Vec<Arc<dyn AuthObserver>>,
}

impl AuthenticationEngine {
    pub fn builder(config: AuthConfig) -> AuthenticationEngineBuilder {
        AuthenticationEngineBuilder {
            config,
            key_set_provider: None,
            role_resolver: None,
            observers: vec![Arc::new(TracingObserver)],
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate against the current wall-clock time.
    pub async fn authenticate(&self, attempt: AuthAttempt<'_>) -> AuthenticationOutcome {
        self.authenticate_at(attempt, Utc::now()).await
    }

    /// Authenticate with expiry evaluated at `now`.
    #[instrument(skip_all, name = "oidc.auth.authenticate", fields(service = %self.config.service_name))]
    pub async fn authenticate_at(
        &self,
        attempt: AuthAttempt<'_>,
        now: DateTime<Utc>,
    ) -> AuthenticationOutcome {
        let start = Instant::now();
        let outcome = self.evaluate(attempt, now).await;
        self.notify(&outcome, start.elapsed());
        outcome
    }

    async fn evaluate(&self, attempt: AuthAttempt<'_>, now: DateTime<Utc>) -> AuthenticationOutcome {
        let transport = match attempt {
            AuthAttempt::IdentityToken(transport) => transport,
            AuthAttempt::Other { kind } => {
                return AuthenticationOutcome::Failed(AuthError::UnsupportedAttempt(
                    kind.to_string(),
                ));
            }
        };

        let carrier = &self.config.token_carrier;
        let raw_token = match transport.extract_token(carrier) {
            Ok(Some(raw_token)) => raw_token,
            Ok(None) => {
                return AuthenticationOutcome::Failed(AuthError::MissingToken {
                    carrier: carrier.clone(),
                });
            }
            Err(e) => {
                tracing::debug!(target: "oidc.auth.engine", error = %e, "Token transport failed");
                return AuthenticationOutcome::Failed(AuthError::MissingToken {
                    carrier: carrier.clone(),
                });
            }
        };

        let service_name = &self.config.service_name;
        let key_set = match self.key_set_provider.key_set(service_name).await {
            Ok(key_set) => key_set,
            Err(source) => {
                return AuthenticationOutcome::Failed(AuthError::KeySetUnavailable {
                    service: service_name.clone(),
                    source,
                });
            }
        };

        let token = match IdentityToken::parse(&raw_token) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(target: "oidc.auth.engine", error = ?e, "Token could not be parsed");
                return AuthenticationOutcome::WrongCredentials(RejectionReason::MalformedToken);
            }
        };

        if !token.has_valid_signature(&key_set) {
            return AuthenticationOutcome::WrongCredentials(RejectionReason::InvalidSignature);
        }

        if token.claims().expires_at().is_none() {
            return AuthenticationOutcome::NeedsReauthentication(
                ReauthenticationReason::MissingExpiry,
            );
        }

        if token.is_expired_at(self.leeway_adjusted(now)) {
            return AuthenticationOutcome::NeedsReauthentication(ReauthenticationReason::Expired);
        }

        let claim = &self.config.account_identifier_claim;
        let Some(account_identifier) = token.claims().account_identifier(claim) else {
            return AuthenticationOutcome::Failed(AuthError::MissingClaim {
                claim: claim.clone(),
            });
        };

        match self.principal_factory.build(
            account_identifier,
            &self.config.roles,
            CredentialSource::from(&token),
        ) {
            Ok(principal) => AuthenticationOutcome::Success(principal),
            Err(e) => AuthenticationOutcome::Failed(AuthError::from(e)),
        }
    }

    /// `exp + leeway <= now` is evaluated as `exp <= now - leeway`.
    fn leeway_adjusted(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.config.clock_skew)
            .ok()
            .and_then(|leeway| now.checked_sub_signed(leeway))
            .unwrap_or(now)
    }

    fn notify(&self, outcome: &AuthenticationOutcome, elapsed: Duration) {
        let event = AuthEvent {
            service_name: self.config.service_name.clone(),
            outcome: outcome.kind(),
            reason: outcome.reason_code(),
            elapsed,
        };
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

impl fmt::Debug for AuthenticationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationEngine")
            .field("config", &self.config)
            .field("principal_factory", &self.principal_factory)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AuthenticationEngine`].
///
/// Starts with a [`TracingObserver`] registered.
pub struct AuthenticationEngineBuilder {
    config: AuthConfig,
    key_set_provider: Option<Arc<dyn KeySetProvider>>,
    role_resolver: Option<Arc<dyn RoleResolver>>,
    observers: Vec<Arc<dyn AuthObserver>>,
}

impl AuthenticationEngineBuilder {
    #[must_use]
    pub fn key_set_provider(mut self, provider: Arc<dyn KeySetProvider>) -> Self {
        self.key_set_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn role_resolver(mut self, resolver: Arc<dyn RoleResolver>) -> Self {
        self.role_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn AuthObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Remove all observers, including the default one.
    #[must_use]
    pub fn clear_observers(mut self) -> Self {
        self.observers.clear();
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid or a required
    /// collaborator was not supplied.
    pub fn build(self) -> Result<AuthenticationEngine, ConfigError> {
        self.config.validate()?;

        let key_set_provider = self
            .key_set_provider
            .ok_or_else(|| ConfigError::MissingCollaborator("key_set_provider".to_string()))?;
        let role_resolver = self
            .role_resolver
            .ok_or_else(|| ConfigError::MissingCollaborator("role_resolver".to_string()))?;

        tracing::debug!(
            target: "oidc.auth.engine",
            service = %self.config.service_name,
            carrier = %self.config.token_carrier,
            roles = self.config.roles.len(),
            "Authentication engine configured"
        );

        Ok(AuthenticationEngine {
            principal_factory: PrincipalFactory::new(
                self.config.provider_name.clone(),
                role_resolver,
            ),
            config: self.config,
            key_set_provider,
            observers: self.observers,
        })
    }
}
