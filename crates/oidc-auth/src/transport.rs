//! Token transports.
//!
//! A transport hands the engine the raw serialized token for a named carrier.
//! It knows nothing about tokens beyond that: no size checks, no decoding.
//! The reference transports below work on raw header values so they can be
//! plugged into any HTTP stack.

use crate::errors::TransportError;
use common::secret::{ExposeSecret, SecretString};
use std::fmt;

/// Source of the raw identity token for one attempt.
pub trait TokenTransport: Send + Sync {
    /// Read the token stored under `carrier_name`.
    ///
    /// `Ok(None)` means the carrier holds no token. Blank values are
    /// reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the carrier exists but cannot be read.
    fn extract_token(&self, carrier_name: &str) -> Result<Option<String>, TransportError>;
}

/// `None` for empty or whitespace-only values.
fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads a named cookie out of a raw `Cookie` header value.
///
/// ```text
/// Cookie: theme=dark; example-jwt=eyJhbGciOi...
/// ```
pub struct CookieHeaderTransport {
    header: Option<SecretString>,
}

impl CookieHeaderTransport {
    /// Transport over the given `Cookie` header value.
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: Some(SecretString::from(header.into())),
        }
    }

    /// Transport for a request that carried no `Cookie` header.
    pub fn absent() -> Self {
        Self { header: None }
    }
}

impl TokenTransport for CookieHeaderTransport {
    fn extract_token(&self, carrier_name: &str) -> Result<Option<String>, TransportError> {
        let Some(header) = &self.header else {
            return Ok(None);
        };

        for pair in header.expose_secret().split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if name.trim() == carrier_name {
                let value = value.trim();
                // RFC 6265 allows cookie values wrapped in double quotes.
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                return Ok(non_blank(value));
            }
        }

        tracing::debug!(
            target: "oidc.auth.transport",
            carrier = %carrier_name,
            "Cookie carrier not present"
        );
        Ok(None)
    }
}

impl fmt::Debug for CookieHeaderTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieHeaderTransport")
            .field("header", &self.header.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Reads a token from a raw `Authorization: Bearer <token>` header value.
///
/// The carrier name is ignored; the header is the carrier.
pub struct BearerHeaderTransport {
    header: Option<SecretString>,
}

impl BearerHeaderTransport {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: Some(SecretString::from(header.into())),
        }
    }

    pub fn absent() -> Self {
        Self { header: None }
    }
}

impl TokenTransport for BearerHeaderTransport {
    fn extract_token(&self, _carrier_name: &str) -> Result<Option<String>, TransportError> {
        let Some(header) = &self.header else {
            return Ok(None);
        };

        let value = header.expose_secret().trim();
        if value.is_empty() {
            return Ok(None);
        }

        let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
        if scheme.eq_ignore_ascii_case("Bearer") {
            return Ok(non_blank(token));
        }

        tracing::debug!(
            target: "oidc.auth.transport",
            "Invalid Authorization header format"
        );
        Err(TransportError::Unreadable(
            "Authorization header does not use the Bearer scheme".to_string(),
        ))
    }
}

impl fmt::Debug for BearerHeaderTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerHeaderTransport")
            .field("header", &self.header.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Always yields the same token, whatever the carrier name.
pub struct StaticTokenTransport {
    token: Option<SecretString>,
}

impl StaticTokenTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
        }
    }

    pub fn empty() -> Self {
        Self { token: None }
    }
}

impl TokenTransport for StaticTokenTransport {
    fn extract_token(&self, _carrier_name: &str) -> Result<Option<String>, TransportError> {
        Ok(self
            .token
            .as_ref()
            .and_then(|token| non_blank(token.expose_secret())))
    }
}

impl fmt::Debug for StaticTokenTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenTransport")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
