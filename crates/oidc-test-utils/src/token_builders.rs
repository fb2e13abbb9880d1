//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating signed identity tokens.

use crate::crypto_fixtures::{TestEcKey, TestHmacKey, TestRsaKey, TestSigningKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use oidc_auth::SignatureAlgorithm;
use serde_json::{Map, Value};

/// Builder for creating signed test identity tokens
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1)?;
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .expires_in(3600)
///     .sign_with(&key);
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    kid_override: Option<Option<String>>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    ///
    /// Defaults: `sub` = "test-subject", `iat` = now, `exp` = now + 1h.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from("test-subject"));
        claims.insert("iat".to_string(), Value::from(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            Value::from((now + Duration::seconds(3600)).timestamp()),
        );
        Self {
            claims,
            kid_override: None,
        }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", subject)
    }

    /// Set expiration in seconds from now; negative values are in the past
    pub fn expires_in(self, seconds: i64) -> Self {
        self.expires_at((Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set expiration to an absolute timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.with_claim("exp", timestamp)
    }

    /// Drop the `exp` claim
    pub fn without_expiry(self) -> Self {
        self.without_claim("exp")
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", timestamp)
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Use this `kid` header instead of the signing key's id
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid_override = Some(Some(kid.to_string()));
        self
    }

    /// Omit the `kid` header
    pub fn without_kid(mut self) -> Self {
        self.kid_override = Some(None);
        self
    }

    /// The claims as a JSON value
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with an Ed25519 key (`alg: EdDSA`)
    pub fn sign_with(self, key: &TestSigningKey) -> String {
        let header = self.header(Algorithm::EdDSA, &key.kid);
        encode(
            &header,
            &self.claims,
            &EncodingKey::from_ed_der(&key.pkcs8),
        )
        .expect("test token signing should succeed")
    }

    /// Sign with an HMAC key (`alg: HS256`)
    pub fn sign_with_hmac(self, key: &TestHmacKey) -> String {
        let header = self.header(Algorithm::HS256, &key.kid);
        encode(
            &header,
            &self.claims,
            &EncodingKey::from_secret(&key.secret),
        )
        .expect("test token signing should succeed")
    }

    /// Sign with an RSA key using `RS256`, `RS384` or `RS512`
    pub fn sign_with_rsa(self, key: &TestRsaKey, algorithm: SignatureAlgorithm) -> String {
        let header = self.header(algorithm.into(), &key.kid);
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem.as_bytes())
            .expect("test RSA key should load");
        encode(&header, &self.claims, &encoding_key).expect("test token signing should succeed")
    }

    /// Sign with a P-384 key (`alg: ES384`)
    pub fn sign_with_p384(self, key: &TestEcKey) -> String {
        let header = self.header(Algorithm::ES384, &key.kid);
        let encoding_key = EncodingKey::from_ec_pem(key.private_key_pem.as_bytes())
            .expect("test EC key should load");
        encode(&header, &self.claims, &encoding_key).expect("test token signing should succeed")
    }

    fn header(&self, algorithm: Algorithm, default_kid: &str) -> Header {
        let mut header = Header::new(algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = match &self.kid_override {
            Some(kid) => kid.clone(),
            None => Some(default_kid.to_string()),
        };
        header
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flip one bit of the token's signature.
///
/// The result still parses; only verification fails.
pub fn flip_signature_bit(token: &str) -> String {
    let (signing_input, signature) = token
        .rsplit_once('.')
        .expect("token should have a signature segment");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature should be base64url");
    bytes[0] ^= 0x01;
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}
