//! Error types for identity-token authentication.
//!
//! Credential problems (malformed token, bad signature, expiry) are NOT
//! errors here: they are ordinary outcomes of an attempt. The types in this
//! module describe infrastructure and configuration failures, which surface
//! as `AuthenticationOutcome::Failed`, plus the low-level parse and
//! collaborator errors that feed into them.
//!
//! Messages for anything derived from the token itself are intentionally
//! generic; details are logged at debug level where they occur.

use common::jwt::JwtValidationError;
use thiserror::Error;

/// Hard failure of an authentication attempt.
///
/// Every variant is a deployment or programming problem rather than a
/// credential problem, and must never be turned into a rejected login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The engine was handed an attempt type it does not understand.
    #[error("Unsupported authentication attempt: {0}")]
    UnsupportedAttempt(String),

    /// No token could be read from the configured carrier.
    #[error("No identity token found in carrier '{carrier}'")]
    MissingToken { carrier: String },

    /// The key set for the configured service could not be obtained.
    #[error("Key set unavailable for service '{service}': {source}")]
    KeySetUnavailable {
        service: String,
        #[source]
        source: KeySetError,
    },

    /// A verified, unexpired token lacks the account identifier claim.
    #[error("Identity token contains no '{claim}' value usable as account identifier")]
    MissingClaim { claim: String },

    /// A configured role identifier did not resolve.
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
}

impl AuthError {
    /// Bounded reason code for logs and metric labels.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::UnsupportedAttempt(_) => "unsupported_attempt",
            AuthError::MissingToken { .. } => "missing_token",
            AuthError::KeySetUnavailable { .. } => "key_set_unavailable",
            AuthError::MissingClaim { .. } => "missing_claim",
            AuthError::UnknownRole(_) => "unknown_role",
        }
    }
}

/// Parse failure of a serialized identity token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("The identity token is invalid")]
    TooLarge,

    #[error("The identity token is invalid")]
    Malformed,

    #[error("The identity token is invalid")]
    MissingAlgorithm,
}

impl From<JwtValidationError> for TokenError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => TokenError::TooLarge,
            JwtValidationError::MalformedToken => TokenError::Malformed,
        }
    }
}

/// Failure of a [`KeySetProvider`](crate::auth::KeySetProvider).
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("No JWKS endpoint registered for service '{0}'")]
    UnknownService(String),

    #[error("JWKS request failed: {0}")]
    Fetch(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("JWKS document is invalid: {0}")]
    InvalidKeySet(String),
}

/// Failure of a [`TokenTransport`](crate::transport::TokenTransport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Token carrier could not be read: {0}")]
    Unreadable(String),
}

/// A role identifier that the role resolver does not know.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown role '{0}'")]
pub struct UnknownRole(pub String);
