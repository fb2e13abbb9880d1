//! JWS signature verification against a JSON Web Key.
//!
//! # Security
//!
//! - The algorithm comes from the token header but must agree with the key:
//!   key type and curve must fit, and a key that declares `alg` only verifies
//!   that algorithm (prevents algorithm confusion, e.g. RS256 key used as an
//!   HS256 secret)
//! - `none` and unknown algorithms never verify
//! - Signatures are checked by `jsonwebtoken::crypto::verify`, which compares
//!   HMAC tags in constant time
//! - Only the signature is checked here; expiry is evaluated separately

use crate::auth::jwks::Jwk;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::decode_jwk_field;
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{Algorithm, DecodingKey};
use std::fmt;
use std::str::FromStr;

/// Signature algorithms accepted for identity tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Rs256,
    Rs384,
    Rs512,
    Es256,
    Es384,
    EdDsa,
    Hs256,
    Hs384,
    Hs512,
}

impl SignatureAlgorithm {
    /// The JOSE name (`alg` header value).
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureAlgorithm::Rs256 => "RS256",
            SignatureAlgorithm::Rs384 => "RS384",
            SignatureAlgorithm::Rs512 => "RS512",
            SignatureAlgorithm::Es256 => "ES256",
            SignatureAlgorithm::Es384 => "ES384",
            SignatureAlgorithm::EdDsa => "EdDSA",
            SignatureAlgorithm::Hs256 => "HS256",
            SignatureAlgorithm::Hs384 => "HS384",
            SignatureAlgorithm::Hs512 => "HS512",
        }
    }

    /// The `kty` a key must have to verify this algorithm.
    fn key_type(self) -> &'static str {
        match self {
            SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384 | SignatureAlgorithm::Rs512 => {
                "RSA"
            }
            SignatureAlgorithm::Es256 | SignatureAlgorithm::Es384 => "EC",
            SignatureAlgorithm::EdDsa => "OKP",
            SignatureAlgorithm::Hs256 | SignatureAlgorithm::Hs384 | SignatureAlgorithm::Hs512 => {
                "oct"
            }
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an `alg` value that is not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported signature algorithm")]
pub struct UnsupportedAlgorithm;

impl FromStr for SignatureAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(SignatureAlgorithm::Rs256),
            "RS384" => Ok(SignatureAlgorithm::Rs384),
            "RS512" => Ok(SignatureAlgorithm::Rs512),
            "ES256" => Ok(SignatureAlgorithm::Es256),
            "ES384" => Ok(SignatureAlgorithm::Es384),
            "EdDSA" => Ok(SignatureAlgorithm::EdDsa),
            "HS256" => Ok(SignatureAlgorithm::Hs256),
            "HS384" => Ok(SignatureAlgorithm::Hs384),
            "HS512" => Ok(SignatureAlgorithm::Hs512),
            _ => Err(UnsupportedAlgorithm),
        }
    }
}

/// Why a signature did not verify. Only used for debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerifyFailure {
    KeyTypeMismatch,
    KeyAlgorithmMismatch,
    KeyNotForSigning,
    CurveMismatch,
    MissingKeyMaterial,
    InvalidKeyEncoding,
    BadSignature,
}

impl VerifyFailure {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            VerifyFailure::KeyTypeMismatch => "key_type_mismatch",
            VerifyFailure::KeyAlgorithmMismatch => "key_algorithm_mismatch",
            VerifyFailure::KeyNotForSigning => "key_not_for_signing",
            VerifyFailure::CurveMismatch => "curve_mismatch",
            VerifyFailure::MissingKeyMaterial => "missing_key_material",
            VerifyFailure::InvalidKeyEncoding => "invalid_key_encoding",
            VerifyFailure::BadSignature => "bad_signature",
        }
    }
}

/// Verify the base64url `signature` over `message` with `jwk` using `alg`.
pub(crate) fn verify(
    alg: SignatureAlgorithm,
    jwk: &Jwk,
    message: &[u8],
    signature: &str,
) -> Result<(), VerifyFailure> {
    check_key_fits(alg, jwk)?;
    let decoding_key = decoding_key(alg, jwk)?;

    match jsonwebtoken::crypto::verify(signature, message, &decoding_key, alg.into()) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(VerifyFailure::BadSignature),
    }
}

impl From<SignatureAlgorithm> for Algorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        match alg {
            SignatureAlgorithm::Rs256 => Algorithm::RS256,
            SignatureAlgorithm::Rs384 => Algorithm::RS384,
            SignatureAlgorithm::Rs512 => Algorithm::RS512,
            SignatureAlgorithm::Es256 => Algorithm::ES256,
            SignatureAlgorithm::Es384 => Algorithm::ES384,
            SignatureAlgorithm::EdDsa => Algorithm::EdDSA,
            SignatureAlgorithm::Hs256 => Algorithm::HS256,
            SignatureAlgorithm::Hs384 => Algorithm::HS384,
            SignatureAlgorithm::Hs512 => Algorithm::HS512,
        }
    }
}

fn check_key_fits(alg: SignatureAlgorithm, jwk: &Jwk) -> Result<(), VerifyFailure> {
    if jwk.kty != alg.key_type() {
        return Err(VerifyFailure::KeyTypeMismatch);
    }
    if let Some(key_alg) = &jwk.alg {
        if key_alg != alg.as_str() {
            return Err(VerifyFailure::KeyAlgorithmMismatch);
        }
    }
    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            return Err(VerifyFailure::KeyNotForSigning);
        }
    }

    let expected_curve = match alg {
        SignatureAlgorithm::Es256 => Some("P-256"),
        SignatureAlgorithm::Es384 => Some("P-384"),
        SignatureAlgorithm::EdDsa => Some("Ed25519"),
        _ => None,
    };
    if let Some(expected) = expected_curve {
        // OKP keys may omit crv for Ed25519; EC keys must name their curve.
        let curve_ok = match (&jwk.crv, alg) {
            (Some(crv), _) => crv == expected,
            (None, SignatureAlgorithm::EdDsa) => true,
            (None, _) => false,
        };
        if !curve_ok {
            return Err(VerifyFailure::CurveMismatch);
        }
    }

    Ok(())
}

/// Build the `DecodingKey` for a key that already fits `alg`.
fn decoding_key(alg: SignatureAlgorithm, jwk: &Jwk) -> Result<DecodingKey, VerifyFailure> {
    let key = match alg {
        SignatureAlgorithm::Rs256 | SignatureAlgorithm::Rs384 | SignatureAlgorithm::Rs512 => {
            let n = minimal_integer(required_field(jwk.n.as_deref())?)?;
            let e = minimal_integer(required_field(jwk.e.as_deref())?)?;
            DecodingKey::from_rsa_components(&n, &e)
        }
        SignatureAlgorithm::Es256 | SignatureAlgorithm::Es384 => DecodingKey::from_ec_components(
            required_field(jwk.x.as_deref())?,
            required_field(jwk.y.as_deref())?,
        ),
        SignatureAlgorithm::EdDsa => {
            DecodingKey::from_ed_components(required_field(jwk.x.as_deref())?)
        }
        SignatureAlgorithm::Hs256 | SignatureAlgorithm::Hs384 | SignatureAlgorithm::Hs512 => {
            let secret = hmac_secret(jwk)?;
            return Ok(DecodingKey::from_secret(secret.expose_secret()));
        }
    };
    key.map_err(|_| VerifyFailure::InvalidKeyEncoding)
}

/// Some providers pad JWK fields; trailing `=` is dropped.
fn required_field(value: Option<&str>) -> Result<&str, VerifyFailure> {
    value
        .map(|v| v.trim_end_matches('='))
        .ok_or(VerifyFailure::MissingKeyMaterial)
}

/// Re-encode a base64url big-endian integer without leading zero octets.
fn minimal_integer(encoded: &str) -> Result<String, VerifyFailure> {
    let bytes = decode_jwk_field(encoded).map_err(|_| VerifyFailure::InvalidKeyEncoding)?;
    Ok(URL_SAFE_NO_PAD.encode(strip_leading_zeros(&bytes)))
}

fn hmac_secret(jwk: &Jwk) -> Result<SecretBox<Vec<u8>>, VerifyFailure> {
    let encoded = jwk.k.as_ref().ok_or(VerifyFailure::MissingKeyMaterial)?;
    let key_bytes =
        decode_jwk_field(encoded.expose_secret()).map_err(|_| VerifyFailure::InvalidKeyEncoding)?;
    if key_bytes.is_empty() {
        return Err(VerifyFailure::MissingKeyMaterial);
    }
    Ok(SecretBox::new(Box::new(key_bytes)))
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.get(start..).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;
    use ring::hmac;
    use ring::rand::SystemRandom;
    use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, KeyPair};

    fn b64(bytes: impl AsRef<[u8]>) -> String {
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn oct_jwk(secret: &[u8]) -> Jwk {
        Jwk {
            kty: "oct".to_string(),
            kid: Some("hmac".to_string()),
            k: Some(SecretString::from(URL_SAFE_NO_PAD.encode(secret))),
            ..Jwk::default()
        }
    }

    fn ed25519_jwk(key_pair: &Ed25519KeyPair) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: Some("ed".to_string()),
            crv: Some("Ed25519".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(key_pair.public_key().as_ref())),
            ..Jwk::default()
        }
    }

    fn ed25519_key_pair() -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed_unchecked(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for name in [
            "RS256", "RS384", "RS512", "ES256", "ES384", "EdDSA", "HS256", "HS384", "HS512",
        ] {
            let alg: SignatureAlgorithm = name.parse().unwrap();
            assert_eq!(alg.as_str(), name);
        }
    }

    #[test]
    fn test_none_and_unknown_algorithms_rejected() {
        assert!("none".parse::<SignatureAlgorithm>().is_err());
        assert!("None".parse::<SignatureAlgorithm>().is_err());
        assert!("PS256".parse::<SignatureAlgorithm>().is_err());
        assert!("rs256".parse::<SignatureAlgorithm>().is_err());
    }

    #[test]
    fn test_hmac_verifies() {
        let secret = [0x42u8; 32];
        let key = hmac::Key::new(hmac::HMAC_SHA256, &secret);
        let tag = hmac::sign(&key, b"header.payload");

        let jwk = oct_jwk(&secret);
        assert!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"header.payload", &b64(&tag)).is_ok()
        );
        assert_eq!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"header.tampered", &b64(&tag)),
            Err(VerifyFailure::BadSignature)
        );
    }

    #[test]
    fn test_hmac_rejects_empty_secret() {
        let jwk = oct_jwk(&[]);
        assert_eq!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"m", &b64([0u8; 32])),
            Err(VerifyFailure::MissingKeyMaterial)
        );
    }

    #[test]
    fn test_ed25519_verifies() {
        let key_pair = ed25519_key_pair();
        let sig = key_pair.sign(b"header.payload");
        let jwk = ed25519_jwk(&key_pair);

        assert!(
            verify(SignatureAlgorithm::EdDsa, &jwk, b"header.payload", &b64(sig)).is_ok()
        );
    }

    #[test]
    fn test_ed25519_flipped_bit_fails() {
        let key_pair = ed25519_key_pair();
        let mut sig = key_pair.sign(b"header.payload").as_ref().to_vec();
        if let Some(first) = sig.first_mut() {
            *first ^= 0x01;
        }

        let jwk = ed25519_jwk(&key_pair);
        assert_eq!(
            verify(SignatureAlgorithm::EdDsa, &jwk, b"header.payload", &b64(&sig)),
            Err(VerifyFailure::BadSignature)
        );
    }

    #[test]
    fn test_es256_verifies() {
        let rng = SystemRandom::new();
        let alg = &signature::ECDSA_P256_SHA256_FIXED_SIGNING;
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng).unwrap();
        let key_pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng).unwrap();
        let sig = key_pair.sign(&rng, b"header.payload").unwrap();

        // public_key() is the uncompressed point 0x04 || X || Y
        let point = key_pair.public_key().as_ref();
        let (x, y) = point.get(1..).unwrap().split_at(32);
        let jwk = Jwk {
            kty: "EC".to_string(),
            kid: Some("ec".to_string()),
            crv: Some("P-256".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(x)),
            y: Some(URL_SAFE_NO_PAD.encode(y)),
            ..Jwk::default()
        };

        assert!(
            verify(SignatureAlgorithm::Es256, &jwk, b"header.payload", &b64(&sig)).is_ok()
        );
        assert_eq!(
            verify(SignatureAlgorithm::Es256, &jwk, b"header.other", &b64(&sig)),
            Err(VerifyFailure::BadSignature)
        );
    }

    #[test]
    fn test_algorithm_confusion_rejected() {
        // An RSA public key must never be usable as an HMAC secret.
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: Some("rsa".to_string()),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
            ..Jwk::default()
        };
        assert_eq!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"m", &b64([0u8; 32])),
            Err(VerifyFailure::KeyTypeMismatch)
        );
    }

    #[test]
    fn test_key_declared_algorithm_must_match() {
        let mut jwk = oct_jwk(&[1u8; 32]);
        jwk.alg = Some("HS512".to_string());
        assert_eq!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"m", &b64([0u8; 32])),
            Err(VerifyFailure::KeyAlgorithmMismatch)
        );
    }

    #[test]
    fn test_encryption_key_rejected() {
        let mut jwk = oct_jwk(&[1u8; 32]);
        jwk.key_use = Some("enc".to_string());
        assert_eq!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"m", &b64([0u8; 32])),
            Err(VerifyFailure::KeyNotForSigning)
        );
    }

    #[test]
    fn test_curve_mismatch_rejected() {
        let key_pair = ed25519_key_pair();
        let mut jwk = ed25519_jwk(&key_pair);
        jwk.crv = Some("X25519".to_string());
        assert_eq!(
            verify(SignatureAlgorithm::EdDsa, &jwk, b"m", &b64([0u8; 64])),
            Err(VerifyFailure::CurveMismatch)
        );
    }

    #[test]
    fn test_rsa_missing_modulus() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            e: Some("AQAB".to_string()),
            ..Jwk::default()
        };
        assert_eq!(
            verify(SignatureAlgorithm::Rs256, &jwk, b"m", &b64([0u8; 256])),
            Err(VerifyFailure::MissingKeyMaterial)
        );
    }

    #[test]
    fn test_rsa_garbage_key_fails_verification() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            n: Some(URL_SAFE_NO_PAD.encode([0xABu8; 256])),
            e: Some("AQAB".to_string()),
            ..Jwk::default()
        };
        assert_eq!(
            verify(SignatureAlgorithm::Rs256, &jwk, b"m", &b64([0u8; 256])),
            Err(VerifyFailure::BadSignature)
        );
    }

    #[test]
    fn test_strip_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 2]), &[1, 2]);
        assert_eq!(strip_leading_zeros(&[1, 0]), &[1, 0]);
        assert!(strip_leading_zeros(&[0, 0]).is_empty());
    }

    #[test]
    fn test_minimal_integer_drops_zero_padding() {
        assert_eq!(minimal_integer(&b64([0, 1, 0, 1])).unwrap(), b64([1, 0, 1]));
        assert_eq!(minimal_integer("AQAB").unwrap(), "AQAB");
        assert_eq!(
            minimal_integer("not base64!"),
            Err(VerifyFailure::InvalidKeyEncoding)
        );
    }

    #[test]
    fn test_malformed_signature_encoding_fails() {
        let secret = [0x42u8; 32];
        let jwk = oct_jwk(&secret);
        assert_eq!(
            verify(SignatureAlgorithm::Hs256, &jwk, b"m", "***"),
            Err(VerifyFailure::BadSignature)
        );
    }
}
