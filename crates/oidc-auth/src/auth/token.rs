//! Parsed identity token.
//!
//! An [`IdentityToken`] is built from the compact JWS serialization issued by
//! the identity provider. Once parsed it never changes: the header, claims
//! and signature are fixed, and [`IdentityToken::serialize`] hands back the
//! exact input bytes, which is what gets stored as a credential record.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Parsing does NOT imply trust; callers must check
//!   [`has_valid_signature`](IdentityToken::has_valid_signature) before
//!   reading claims
//! - A token without an `exp` claim is always treated as expired
//! - The serialized form and signature are redacted in Debug output

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, KeySet};
use crate::auth::signature::{self, SignatureAlgorithm};
use crate::errors::TokenError;
use chrono::{DateTime, Utc};
use common::jwt::{decode_json_segment, decode_segment, split_compact};
use serde_json::Value;
use std::fmt;

/// JOSE header fields relevant to verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// `alg` header value, as sent.
    pub algorithm: String,

    /// `kid` header value, if present.
    pub key_id: Option<String>,

    /// `typ` header value, if present.
    pub token_type: Option<String>,
}

impl TokenHeader {
    fn from_json(mut header: serde_json::Map<String, Value>) -> Result<Self, TokenError> {
        let algorithm = match header.remove("alg") {
            Some(Value::String(alg)) if !alg.is_empty() => alg,
            Some(_) => return Err(TokenError::Malformed),
            None => return Err(TokenError::MissingAlgorithm),
        };

        Ok(Self {
            algorithm,
            key_id: optional_string(header.remove("kid"))?,
            token_type: optional_string(header.remove("typ"))?,
        })
    }
}

/// `None` for absent, `Some` for a string, error for anything else.
fn optional_string(value: Option<Value>) -> Result<Option<String>, TokenError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(TokenError::Malformed),
    }
}

/// Immutable parsed identity token.
#[derive(Clone, PartialEq)]
pub struct IdentityToken {
    header: TokenHeader,
    claims: Claims,
    signature: Vec<u8>,
    serialized: String,
    /// Byte length of `header.payload`, the signing input.
    signing_input_len: usize,
}

impl IdentityToken {
    /// Parse a compact serialized token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is oversized, does not have three
    /// segments, has a segment that is not base64url, has a header or
    /// payload that is not a JSON object, or has no `alg` header.
    pub fn parse(serialized: &str) -> Result<Self, TokenError> {
        let (header_b64, payload_b64, signature_b64) = split_compact(serialized)?;

        let header = TokenHeader::from_json(decode_json_segment(header_b64)?)?;
        let claims = Claims::from_json(decode_json_segment(payload_b64)?);
        let signature = decode_segment(signature_b64)?;

        Ok(Self {
            header,
            claims,
            signature,
            serialized: serialized.to_string(),
            signing_input_len: header_b64.len() + 1 + payload_b64.len(),
        })
    }

    /// Check the signature against the key set.
    ///
    /// The key is selected by the token's `kid`. A token without `kid` is
    /// checked against the only key of a single-key set. Returns `false`
    /// rather than an error for every failure: unknown key id, unsupported
    /// algorithm, key/algorithm mismatch, unusable key material, or a
    /// signature that does not verify.
    pub fn has_valid_signature(&self, key_set: &KeySet) -> bool {
        let Ok(alg) = self.header.algorithm.parse::<SignatureAlgorithm>() else {
            tracing::debug!(
                target: "oidc.auth.token",
                alg = %self.header.algorithm,
                "Token rejected: unsupported algorithm"
            );
            return false;
        };

        let Some(jwk) = self.select_key(key_set) else {
            tracing::debug!(
                target: "oidc.auth.token",
                kid = ?self.header.key_id,
                key_count = key_set.len(),
                "Token rejected: no matching key in key set"
            );
            return false;
        };

        match signature::verify(alg, jwk, self.signing_input(), self.signature_segment()) {
            Ok(()) => true,
            Err(failure) => {
                tracing::debug!(
                    target: "oidc.auth.token",
                    alg = %alg,
                    reason = failure.as_str(),
                    "Token signature verification failed"
                );
                false
            }
        }
    }

    /// `true` iff the token must not be accepted at `instant`.
    ///
    /// A token is expired when `exp <= instant`. A token with no usable
    /// `exp` claim is treated as expired.
    pub fn is_expired_at(&self, instant: DateTime<Utc>) -> bool {
        match self.claims.expires_at() {
            Some(exp) => exp <= instant,
            None => true,
        }
    }

    /// Read-only view of the payload claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    pub fn algorithm(&self) -> &str {
        &self.header.algorithm
    }

    pub fn key_id(&self) -> Option<&str> {
        self.header.key_id.as_deref()
    }

    /// Raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The original serialized form, unchanged.
    pub fn serialize(&self) -> &str {
        &self.serialized
    }

    fn signing_input(&self) -> &[u8] {
        self.serialized
            .as_bytes()
            .get(..self.signing_input_len)
            .unwrap_or_default()
    }

    fn signature_segment(&self) -> &str {
        self.serialized
            .get(self.signing_input_len + 1..)
            .unwrap_or_default()
    }

    fn select_key<'a>(&self, key_set: &'a KeySet) -> Option<&'a Jwk> {
        match &self.header.key_id {
            Some(kid) => key_set.get(kid),
            None => key_set.sole_key(),
        }
    }
}

/// Custom Debug implementation that redacts the serialized token and signature.
impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToken")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("signature", &"[REDACTED]")
            .field("serialized", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use common::jwt::MAX_JWT_SIZE_BYTES;
    use common::secret::SecretString;
    use ring::hmac;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn hmac_key_set(kid: &str) -> KeySet {
        KeySet::new(vec![Jwk {
            kty: "oct".to_string(),
            kid: Some(kid.to_string()),
            k: Some(SecretString::from(URL_SAFE_NO_PAD.encode(SECRET))),
            ..Jwk::default()
        }])
    }

    fn signed_token(header: &str, payload: &str) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let key = hmac::Key::new(hmac::HMAC_SHA256, SECRET);
        let tag = hmac::sign(&key, signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()))
    }

    fn timestamp(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    // -------------------------------------------------------------------------
    // parse
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_valid_token() {
        let token = signed_token(
            r#"{"alg":"HS256","typ":"JWT","kid":"k1"}"#,
            r#"{"sub":"alice","exp":1700000000}"#,
        );

        let parsed = IdentityToken::parse(&token).unwrap();

        assert_eq!(parsed.algorithm(), "HS256");
        assert_eq!(parsed.key_id(), Some("k1"));
        assert_eq!(parsed.header().token_type.as_deref(), Some("JWT"));
        assert_eq!(parsed.claims().string("sub"), Some("alice"));
        assert_eq!(parsed.signature().len(), 32);
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert_eq!(
            IdentityToken::parse("only.two"),
            Err(TokenError::Malformed)
        );
        assert_eq!(IdentityToken::parse(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_parse_rejects_non_json_payload() {
        let token = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode("not json")
        );
        assert_eq!(IdentityToken::parse(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_parse_rejects_invalid_signature_encoding() {
        let token = format!(
            "{}.{}.!!!",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"alice"}"#)
        );
        assert_eq!(IdentityToken::parse(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_parse_requires_alg() {
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"alice"}"#)
        );
        assert_eq!(
            IdentityToken::parse(&token),
            Err(TokenError::MissingAlgorithm)
        );
    }

    #[test]
    fn test_parse_rejects_non_string_kid() {
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","kid":12345}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"alice"}"#)
        );
        assert_eq!(IdentityToken::parse(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_parse_rejects_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(IdentityToken::parse(&oversized), Err(TokenError::TooLarge));
    }

    // -------------------------------------------------------------------------
    // serialize
    // -------------------------------------------------------------------------

    #[test]
    fn test_serialize_returns_original_bytes() {
        // Unusual but valid JSON spacing must survive untouched.
        let token = signed_token(
            r#"{ "alg" : "HS256", "kid":"k1" }"#,
            r#"{"exp": 1700000000,  "sub":"alice"}"#,
        );

        let parsed = IdentityToken::parse(&token).unwrap();
        assert_eq!(parsed.serialize(), token);
    }

    #[test]
    fn test_parse_serialize_round_trip() {
        let token = signed_token(
            r#"{"alg":"HS256","kid":"k1"}"#,
            r#"{"sub":"alice","exp":1700000000,"groups":["a","b"]}"#,
        );

        let first = IdentityToken::parse(&token).unwrap();
        let second = IdentityToken::parse(first.serialize()).unwrap();
        assert_eq!(first, second);
    }

    // -------------------------------------------------------------------------
    // has_valid_signature
    // -------------------------------------------------------------------------

    #[test]
    fn test_valid_signature() {
        let token = signed_token(r#"{"alg":"HS256","kid":"k1"}"#, r#"{"sub":"alice"}"#);
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(parsed.has_valid_signature(&hmac_key_set("k1")));
    }

    #[test]
    fn test_unknown_kid_is_invalid() {
        let token = signed_token(r#"{"alg":"HS256","kid":"k1"}"#, r#"{"sub":"alice"}"#);
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(!parsed.has_valid_signature(&hmac_key_set("other")));
        assert!(!parsed.has_valid_signature(&KeySet::default()));
    }

    #[test]
    fn test_missing_kid_uses_sole_key() {
        let token = signed_token(r#"{"alg":"HS256"}"#, r#"{"sub":"alice"}"#);
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(parsed.has_valid_signature(&hmac_key_set("k1")));

        let mut keys: Vec<Jwk> = hmac_key_set("k1").iter().cloned().collect();
        keys.extend(hmac_key_set("k2").iter().cloned());
        assert!(!parsed.has_valid_signature(&KeySet::new(keys)));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let token = signed_token(
            r#"{"alg":"HS256","kid":"k1"}"#,
            r#"{"sub":"alice"}"#,
        );
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"mallory"}"#);
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        let parsed = IdentityToken::parse(&forged).unwrap();
        assert!(!parsed.has_valid_signature(&hmac_key_set("k1")));
    }

    #[test]
    fn test_alg_none_is_invalid() {
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none","kid":"k1"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"alice"}"#)
        );
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(!parsed.has_valid_signature(&hmac_key_set("k1")));
    }

    // -------------------------------------------------------------------------
    // is_expired_at
    // -------------------------------------------------------------------------

    #[test]
    fn test_expiry_boundary_is_expired() {
        let token = signed_token(r#"{"alg":"HS256"}"#, r#"{"exp":1700000000}"#);
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(!parsed.is_expired_at(timestamp(1_699_999_999)));
        assert!(parsed.is_expired_at(timestamp(1_700_000_000)));
        assert!(parsed.is_expired_at(timestamp(1_700_000_001)));
    }

    #[test]
    fn test_fractional_exp_keeps_sub_second_precision() {
        let token = signed_token(r#"{"alg":"HS256"}"#, r#"{"exp":1700000000.5}"#);
        let parsed = IdentityToken::parse(&token).unwrap();
        let at = |millis: u32| {
            DateTime::<Utc>::from_timestamp(1_700_000_000, millis * 1_000_000).unwrap()
        };

        assert!(!parsed.is_expired_at(at(100)));
        assert!(!parsed.is_expired_at(at(499)));
        assert!(parsed.is_expired_at(at(500)));
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = signed_token(r#"{"alg":"HS256"}"#, r#"{"sub":"alice"}"#);
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(parsed.is_expired_at(timestamp(0)));
    }

    #[test]
    fn test_non_numeric_exp_is_expired() {
        let token = signed_token(r#"{"alg":"HS256"}"#, r#"{"exp":"never"}"#);
        let parsed = IdentityToken::parse(&token).unwrap();

        assert!(parsed.is_expired_at(timestamp(0)));
    }

    // -------------------------------------------------------------------------
    // Debug
    // -------------------------------------------------------------------------

    #[test]
    fn test_debug_redacts_token() {
        let token = signed_token(r#"{"alg":"HS256"}"#, r#"{"sub":"secret-user-id"}"#);
        let parsed = IdentityToken::parse(&token).unwrap();
        let debug_str = format!("{parsed:?}");

        assert!(!debug_str.contains(&token));
        assert!(!debug_str.contains("secret-user-id"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
