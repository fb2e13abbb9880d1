//! Compact JWT primitives shared across the workspace.
//!
//! This module provides the low-level pieces every token consumer needs:
//! - Size limits for DoS prevention
//! - Clock skew bounds for expiry leeway
//! - Splitting a compact token into its three segments
//! - base64url segment decoding (JSON segments and raw bytes)
//! - Decoding base64url fields of a JSON Web Key
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any segment is decoded
//! - Error messages are generic; details go to `debug!` logs only
//! - Nothing in this module verifies a signature. Callers MUST verify before
//!   trusting any decoded claim.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_compact, decode_json_segment};
//!
//! let (header_b64, payload_b64, signature_b64) = split_compact(token)?;
//! let header = decode_json_segment(header_b64)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity tokens from common providers are 800-2000 bytes (RSA signature,
/// profile claims). Anything larger than 8KB is rejected before base64
/// decoding or JSON parsing takes place.
///
/// Per OWASP API Security Top 10 - API4:2023 (Unrestricted Resource Consumption)
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default expiry leeway: none. `exp <= now` means expired.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed expiry leeway (10 minutes).
///
/// Prevents a misconfiguration from keeping expired tokens alive for long.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a compact JWT.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The identity token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not a valid compact JWT structure).
    #[error("The identity token is invalid")]
    MalformedToken,
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact JWT into its `(header, payload, signature)` segments.
///
/// The size limit is enforced first. The segments are returned still
/// base64url-encoded; nothing is decoded here.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Token does not have exactly three `.`-separated parts
pub fn split_compact(token: &str) -> Result<(&str, &str, &str), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => {
            tracing::debug!(
                target: "common.jwt",
                parts = token.split('.').count(),
                "Token rejected: invalid JWT format"
            );
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Decode a base64url (unpadded) segment into raw bytes.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not valid unpadded base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

/// Decode a base64url segment that must contain a JSON object.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not base64url, not JSON, or
/// the JSON value is not an object.
pub fn decode_json_segment(segment: &str) -> Result<Map<String, Value>, JwtValidationError> {
    let bytes = decode_segment(segment)?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => {
            tracing::debug!(target: "common.jwt", "JWT segment is not a JSON object");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Decode a base64url field of a JSON Web Key (`x`, `y`, `n`, `e`, `k`).
///
/// Some providers pad these values; trailing `=` is tolerated.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content cannot be decoded.
pub fn decode_jwk_field(b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(b64url.trim_end_matches('='))
}

// =============================================================================
// Tests
// =============================================================================
