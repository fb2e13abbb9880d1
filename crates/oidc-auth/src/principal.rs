//! Authenticated principals and role resolution.
//!
//! A [`Principal`] is created only after a token has been fully validated.
//! It is transient: the engine hands it to the caller and keeps nothing. The
//! only part meant for storage is the [`CredentialSource`], the verbatim
//! serialized token.

use crate::auth::token::IdentityToken;
use crate::errors::{TokenError, UnknownRole};
use common::secret::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A role granted to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role {
    pub identifier: String,
    pub name: String,
}

impl Role {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
        }
    }
}

/// Resolves configured role identifiers to roles.
pub trait RoleResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns `UnknownRole` if no role has this identifier.
    fn resolve(&self, role_identifier: &str) -> Result<Role, UnknownRole>;
}

/// In-memory role registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleResolver {
    roles: HashMap<String, Role>,
}

impl StaticRoleResolver {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles
                .into_iter()
                .map(|role| (role.identifier.clone(), role))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl RoleResolver for StaticRoleResolver {
    fn resolve(&self, role_identifier: &str) -> Result<Role, UnknownRole> {
        self.roles
            .get(role_identifier)
            .cloned()
            .ok_or_else(|| UnknownRole(role_identifier.to_string()))
    }
}

/// The serialized token a principal was authenticated with.
///
/// Opaque to this crate. Redacted in Debug output.
#[derive(Clone)]
pub struct CredentialSource(SecretString);

impl CredentialSource {
    /// The serialized token, exactly as received.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Re-parse the stored token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the stored value is not a parseable token.
    pub fn to_identity_token(&self) -> Result<IdentityToken, TokenError> {
        IdentityToken::parse(self.expose())
    }
}

impl From<&IdentityToken> for CredentialSource {
    fn from(token: &IdentityToken) -> Self {
        Self(SecretString::from(token.serialize().to_string()))
    }
}

impl PartialEq for CredentialSource {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialSource([REDACTED])")
    }
}

/// An authenticated identity with its roles.
#[derive(Clone, PartialEq)]
pub struct Principal {
    identity: String,
    roles: Vec<Role>,
    provider_name: String,
    credential_source: CredentialSource,
}

impl Principal {
    /// The account identifier taken from the token.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Granted roles, in configured order.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has_role(&self, identifier: &str) -> bool {
        self.roles.iter().any(|role| role.identifier == identifier)
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn credential_source(&self) -> &CredentialSource {
        &self.credential_source
    }
}

/// The identity is redacted; it is a user identifier.
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("identity", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("provider_name", &self.provider_name)
            .field("credential_source", &self.credential_source)
            .finish()
    }
}

/// Builds principals for one identity provider.
#[derive(Clone)]
pub struct PrincipalFactory {
    provider_name: String,
    role_resolver: Arc<dyn RoleResolver>,
}

impl PrincipalFactory {
    pub fn new(provider_name: impl Into<String>, role_resolver: Arc<dyn RoleResolver>) -> Self {
        Self {
            provider_name: provider_name.into(),
            role_resolver,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Build a principal holding every listed role.
    ///
    /// Repeated role identifiers keep their first position. Resolution is
    /// all-or-nothing: no principal is built unless every role resolves.
    ///
    /// # Errors
    ///
    /// Returns the first `UnknownRole` encountered.
    pub fn build(
        &self,
        account_identifier: impl Into<String>,
        role_identifiers: &[String],
        credential_source: CredentialSource,
    ) -> Result<Principal, UnknownRole> {
        let mut seen = HashSet::new();
        let roles = role_identifiers
            .iter()
            .filter(|identifier| seen.insert(identifier.as_str()))
            .map(|identifier| self.role_resolver.resolve(identifier))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Principal {
            identity: account_identifier.into(),
            roles,
            provider_name: self.provider_name.clone(),
            credential_source,
        })
    }
}

impl fmt::Debug for PrincipalFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrincipalFactory")
            .field("provider_name", &self.provider_name)
            .finish_non_exhaustive()
    }
}
