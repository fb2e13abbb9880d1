//! Typed view over identity-token claims.
//!
//! The payload of an identity token is an open-ended JSON object. Claims are
//! kept as a mapping from name to [`ClaimValue`], so arbitrary claims stay
//! reachable while the two claims authentication depends on (expiry and the
//! account identifier) get typed accessors.
//!
//! Registered time claims (`exp`, `iat`, `nbf`, `auth_time`) holding a
//! NumericDate are converted to [`ClaimValue::Timestamp`]. A time claim with
//! any other shape keeps its raw variant, so `expires_at()` reports it as
//! absent.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Claim names whose values are NumericDate (RFC 7519 section 2).
const TIME_CLAIMS: [&str; 4] = ["exp", "iat", "nbf", "auth_time"];

/// A single claim value.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    String(String),
    Number(Number),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
    /// Arrays, objects and `null`, kept verbatim.
    Json(Value),
}

impl ClaimValue {
    fn from_json(name: &str, value: Value) -> Self {
        match value {
            Value::Number(n) if TIME_CLAIMS.contains(&name) => match numeric_date(&n) {
                Some(ts) => ClaimValue::Timestamp(ts),
                None => ClaimValue::Number(n),
            },
            Value::Number(n) => ClaimValue::Number(n),
            Value::String(s) => ClaimValue::String(s),
            Value::Bool(b) => ClaimValue::Boolean(b),
            other => ClaimValue::Json(other),
        }
    }

    /// The value as a string slice, if it is a string claim.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a timestamp, if it is a time claim.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ClaimValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// The value as a signed integer, if it is an integral number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Number(n) => n.as_i64(),
            ClaimValue::Timestamp(ts) => Some(ts.timestamp()),
            _ => None,
        }
    }
}

/// Convert a NumericDate to a UTC timestamp.
///
/// Fractional seconds are kept to nanosecond precision. Values outside
/// chrono's representable range yield `None`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn numeric_date(n: &Number) -> Option<DateTime<Utc>> {
    if let Some(secs) = n.as_i64() {
        return DateTime::<Utc>::from_timestamp(secs, 0);
    }

    let f = n.as_f64().filter(|f| f.is_finite())?;
    let secs = f.floor();
    // floor keeps the fraction in [0, 1); saturating casts, range-checked below.
    let nanos = (((f - secs) * 1e9) as u32).min(999_999_999);
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
}

/// Read-only set of claims from a token payload.
#[derive(Clone, PartialEq, Default)]
pub struct Claims {
    values: BTreeMap<String, ClaimValue>,
}

impl Claims {
    /// Build claims from a decoded JSON payload object.
    pub fn from_json(payload: Map<String, Value>) -> Self {
        let values = payload
            .into_iter()
            .map(|(name, value)| {
                let claim = ClaimValue::from_json(&name, value);
                (name, claim)
            })
            .collect();
        Self { values }
    }

    /// Look up a claim by name.
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over all claims in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expiry (`exp`) as a timestamp. `None` if missing or not a NumericDate.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.get("exp").and_then(ClaimValue::as_timestamp)
    }

    /// Issued-at (`iat`) as a timestamp.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.get("iat").and_then(ClaimValue::as_timestamp)
    }

    /// A string claim by name.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ClaimValue::as_str)
    }

    /// The claim `name` rendered as an account identifier.
    ///
    /// Strings are used as-is and numbers in their JSON form. Empty strings,
    /// booleans, timestamps and structured values yield `None`.
    pub fn account_identifier(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            ClaimValue::String(s) if !s.is_empty() => Some(s.clone()),
            ClaimValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Claim values may carry personal data; only names and expiry are shown.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .field("exp", &self.expires_at())
            .finish()
    }
}
