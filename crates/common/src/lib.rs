//! Shared primitives for the OIDC authentication workspace.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for compact JWT utilities (size limits, clock skew, segment and JWK field decoding)
pub mod jwt;
