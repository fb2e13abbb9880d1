//! Identity-token primitives.
//!
//! - `claims` - typed view over the token payload
//! - `jwks` - key sets, the `KeySetProvider` trait and the HTTP `JwksClient`
//! - `signature` - per-algorithm signature verification
//! - `token` - the parsed `IdentityToken`

pub mod claims;
pub mod jwks;
pub mod signature;
pub mod token;

pub use claims::{ClaimValue, Claims};
pub use jwks::{Jwk, JwksClient, KeySet, KeySetProvider};
pub use signature::SignatureAlgorithm;
pub use token::{IdentityToken, TokenHeader};
