//! Key sets and the JWKS client that fetches them.
//!
//! [`KeySetProvider`] is the boundary the authentication engine depends on.
//! [`JwksClient`] is the reference implementation: it fetches each service's
//! `jwks_uri` document over HTTP and caches it with a configurable TTL.
//!
//! # Security
//!
//! - Keys are cached to reduce load on the identity provider
//! - Cache entries expire on TTL so key rotations are picked up
//! - Symmetric key material (`k`) is held as a secret and never logged
//! - HTTPS should be used in production (enforced by deployment config)

use crate::errors::KeySetError;
use async_trait::async_trait;
use common::secret::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Timeout for a single JWKS request.
const HTTP_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key (RFC 7517) as published in a key set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA", "EC", "OKP" or "oct".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm this key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Symmetric key value (base64url). Redacted in Debug output.
    #[serde(default)]
    pub k: Option<SecretString>,
}

/// JWKS document: `{"keys": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Verification keys currently published for one service.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Jwk>,
}

impl KeySet {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Parse a JWKS JSON document.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::InvalidKeySet` if the document is not a JWKS.
    pub fn from_json(json: &str) -> Result<Self, KeySetError> {
        let response: JwksResponse = serde_json::from_str(json)
            .map_err(|e| KeySetError::InvalidKeySet(e.to_string()))?;
        Ok(response.into())
    }

    /// Look up a key by its `kid`.
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// The only key of a single-key set.
    pub fn sole_key(&self) -> Option<&Jwk> {
        match self.keys.as_slice() {
            [key] => Some(key),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jwk> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<JwksResponse> for KeySet {
    fn from(response: JwksResponse) -> Self {
        Self::new(response.keys)
    }
}

/// Supplies the current key set for a named service.
///
/// Implementations own fetching, caching and refresh policy. Callers get one
/// answer per call and never retry.
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `KeySetError` on network or parse failure.
    async fn key_set(&self, service_name: &str) -> Result<Arc<KeySet>, KeySetError>;
}

/// Cached key set with expiry time.
struct CachedKeySet {
    keys: Arc<KeySet>,
    expires_at: Instant,
}

/// HTTP key-set provider with a per-service TTL cache.
///
/// Each service name maps to one JWKS URL. Register endpoints with
/// [`JwksClient::register`] before use.
pub struct JwksClient {
    /// Service name to JWKS URL.
    endpoints: HashMap<String, String>,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached key sets by service name.
    cache: RwLock<HashMap<String, CachedKeySet>>,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a JWKS client with the default cache TTL.
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a JWKS client with a custom cache TTL.
    pub fn with_ttl(cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "oidc.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            endpoints: HashMap::new(),
            http_client,
            cache: RwLock::new(HashMap::new()),
            cache_ttl,
        }
    }

    /// Register the JWKS URL for a service.
    #[must_use]
    pub fn register(
        mut self,
        service_name: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        self.endpoints.insert(service_name.into(), jwks_url.into());
        self
    }

    /// The JWKS URL registered for a service.
    pub fn jwks_url(&self, service_name: &str) -> Option<&str> {
        self.endpoints.get(service_name).map(String::as_str)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Fetch the key set again, ignoring any cached entry.
    ///
    /// # Errors
    ///
    /// Same as [`KeySetProvider::key_set`].
    pub async fn force_refresh(&self, service_name: &str) -> Result<Arc<KeySet>, KeySetError> {
        self.refresh_cache(service_name).await
    }

    /// Drop all cached key sets.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    #[instrument(skip(self))]
    async fn refresh_cache(&self, service_name: &str) -> Result<Arc<KeySet>, KeySetError> {
        let url = self.jwks_url(service_name).ok_or_else(|| {
            tracing::error!(target: "oidc.auth.jwks", service = %service_name, "No JWKS endpoint registered");
            KeySetError::UnknownService(service_name.to_string())
        })?;

        tracing::debug!(target: "oidc.auth.jwks", url = %url, "Fetching JWKS");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::error!(target: "oidc.auth.jwks", error = %e, "Failed to fetch JWKS");
            KeySetError::Fetch(e.to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "oidc.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "oidc.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeySetError::InvalidKeySet(e.to_string())
        })?;

        let keys = Arc::new(KeySet::from(jwks));

        tracing::info!(
            target: "oidc.auth.jwks",
            service = %service_name,
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        cache.insert(
            service_name.to_string(),
            CachedKeySet {
                keys: Arc::clone(&keys),
                expires_at: Instant::now() + self.cache_ttl,
            },
        );

        Ok(keys)
    }
}

impl Default for JwksClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeySetProvider for JwksClient {
    #[instrument(skip(self))]
    async fn key_set(&self, service_name: &str) -> Result<Arc<KeySet>, KeySetError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(service_name) {
                if cached.expires_at > Instant::now() {
                    tracing::debug!(target: "oidc.auth.jwks", service = %service_name, "JWKS cache hit");
                    return Ok(Arc::clone(&cached.keys));
                }
            }
        }

        // Cache miss or expired - fetch fresh JWKS
        self.refresh_cache(service_name).await
    }
}
