//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for identity tokens, credential
//! sources and symmetric key material.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that holds one is safe to pass to `{:?}` or `tracing`. Secrets are
//! zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StoredCredential {
//!     provider: String,
//!     identity_token: SecretString,
//! }
//!
//! let record = StoredCredential {
//!     provider: "example".to_string(),
//!     identity_token: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! // Safe: the token is redacted
//! println!("{:?}", record);
//!
//! // Reading the value is always explicit
//! let raw: &str = record.identity_token.expose_secret();
//! assert!(raw.starts_with("eyJ"));
//! ```
//!
//! Use `SecretString` for serialized identity tokens and credential records,
//! and `SecretBox<Vec<u8>>` for shared HMAC keys taken from a key set.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
