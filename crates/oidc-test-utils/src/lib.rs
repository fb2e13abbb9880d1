//! # OIDC Test Utilities
//!
//! Shared test utilities for the `oidc-auth` crate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed keys for reproducible tests)
//! - Signed test-token builders (TestTokenBuilder)
//! - In-memory collaborators (key-set providers, recording observer)
//! - Custom assertions (OutcomeAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oidc_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = test_signing_key(1)?;
//!     let token = TestTokenBuilder::new().for_user("alice").sign_with(&key);
//!
//!     let outcome = engine.authenticate(AuthAttempt::IdentityToken(&transport)).await;
//!     outcome.assert_success().assert_identity("alice");
//! }
//! ```

pub mod assertions;
pub mod collaborators;
pub mod crypto_fixtures;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use collaborators::*;
pub use crypto_fixtures::*;
pub use token_builders::*;
