//! Authentication configuration.
//!
//! Configuration is loaded from environment variables, or built in code with
//! [`AuthConfig::new`] and the `with_*` setters. Debug output contains no
//! secrets and is safe to log.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default claim holding the account identifier.
pub const DEFAULT_ACCOUNT_IDENTIFIER_CLAIM: &str = "sub";

/// Default provider name recorded on principals.
pub const DEFAULT_PROVIDER_NAME: &str = "oidc";

/// Suffix appended to the service name to form the default carrier name.
pub const TOKEN_CARRIER_SUFFIX: &str = "-jwt";

/// Authentication configuration for one service.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Service whose key set verifies tokens.
    pub service_name: String,

    /// Role identifiers granted on success, in order, without duplicates.
    pub roles: Vec<String>,

    /// Claim read as the account identifier (default: "sub").
    pub account_identifier_claim: String,

    /// Provider name recorded on principals (default: "oidc").
    pub provider_name: String,

    /// Name the transport looks the token up under (default: "<service>-jwt").
    pub token_carrier: String,

    /// Leeway applied to the expiry check (default: 0, max: 600s).
    pub clock_skew: Duration,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("service_name", &self.service_name)
            .field("roles", &self.roles)
            .field("account_identifier_claim", &self.account_identifier_claim)
            .field("provider_name", &self.provider_name)
            .field("token_carrier", &self.token_carrier)
            .field("clock_skew_seconds", &self.clock_skew.as_secs())
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid clock skew configuration: {0}")]
    InvalidClockSkew(String),

    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(String),
}

/// Drop blanks and repeats, keeping first occurrences in order.
fn normalize_roles<I, S>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    roles
        .into_iter()
        .map(|role| role.as_ref().trim().to_string())
        .filter(|role| !role.is_empty())
        .filter(|role| seen.insert(role.clone()))
        .collect()
}

impl AuthConfig {
    /// Configuration with defaults for everything but the service and roles.
    pub fn new<I, S>(service_name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let service_name = service_name.into();
        let token_carrier = format!("{service_name}{TOKEN_CARRIER_SUFFIX}");
        Self {
            service_name,
            roles: normalize_roles(roles),
            account_identifier_claim: DEFAULT_ACCOUNT_IDENTIFIER_CLAIM.to_string(),
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
            token_carrier,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    #[must_use]
    pub fn with_account_identifier_claim(mut self, claim: impl Into<String>) -> Self {
        self.account_identifier_claim = claim.into();
        self
    }

    #[must_use]
    pub fn with_provider_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    #[must_use]
    pub fn with_token_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.token_carrier = carrier.into();
        self
    }

    #[must_use]
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a blank service name, claim name, provider
    /// name or carrier, or a clock skew above the allowed maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("service_name", &self.service_name),
            ("account_identifier_claim", &self.account_identifier_claim),
            ("provider_name", &self.provider_name),
            ("token_carrier", &self.token_carrier),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "{field} must not be blank"
                )));
            }
        }

        if self.clock_skew > MAX_CLOCK_SKEW {
            return Err(ConfigError::InvalidClockSkew(format!(
                "clock skew must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                self.clock_skew.as_secs()
            )));
        }

        Ok(())
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let service_name = vars
            .get("OIDC_SERVICE_NAME")
            .ok_or_else(|| ConfigError::MissingEnvVar("OIDC_SERVICE_NAME".to_string()))?;

        // An empty role list is allowed, a missing one is not.
        let roles = vars
            .get("OIDC_ROLES")
            .ok_or_else(|| ConfigError::MissingEnvVar("OIDC_ROLES".to_string()))?;

        let mut config = AuthConfig::new(service_name.trim(), roles.split(','));

        if let Some(claim) = vars.get("OIDC_ACCOUNT_IDENTIFIER_CLAIM") {
            config.account_identifier_claim = claim.trim().to_string();
        }

        if let Some(provider_name) = vars.get("OIDC_PROVIDER_NAME") {
            config.provider_name = provider_name.trim().to_string();
        }

        if let Some(carrier) = vars.get("OIDC_TOKEN_CARRIER") {
            config.token_carrier = carrier.trim().to_string();
        }

        if let Some(value_str) = vars.get("OIDC_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.trim().parse().map_err(|e| {
                ConfigError::InvalidClockSkew(format!(
                    "OIDC_CLOCK_SKEW_SECONDS must be a valid non-negative integer, got '{value_str}': {e}"
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidClockSkew(format!(
                    "OIDC_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {value}",
                    MAX_CLOCK_SKEW.as_secs()
                )));
            }

            config.clock_skew = Duration::from_secs(value);
        }

        config.validate()?;
        Ok(config)
    }
}
