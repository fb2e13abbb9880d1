//! OpenID Connect identity-token authentication.
//!
//! Validates a signed identity token issued by an external OpenID Connect
//! provider and maps it onto a local [`Principal`] with a fixed set of roles.
//! Ambiguous input never yields a principal.
//!
//! # Architecture
//!
//! ```text
//! TokenTransport ──┐
//! KeySetProvider ──┼─> AuthenticationEngine ─> AuthenticationOutcome
//! RoleResolver ────┘         │
//!                            └─> AuthObserver (tracing, metrics)
//! ```
//!
//! # Modules
//!
//! - `auth` - identity token, claims, signature verification, key sets
//! - `config` - configuration from environment or code
//! - `engine` - the authentication decision pipeline
//! - `errors` - error types
//! - `observability` - observer hooks, tracing and metrics observers
//! - `principal` - principals, roles and role resolution
//! - `transport` - token transports
//!
//! # Example
//!
//! ```rust,ignore
//! let config = AuthConfig::from_env()?;
//! let engine = AuthenticationEngine::builder(config)
//!     .key_set_provider(Arc::new(JwksClient::new().register("example", jwks_url)))
//!     .role_resolver(Arc::new(StaticRoleResolver::new(roles)))
//!     .build()?;
//!
//! let transport = CookieHeaderTransport::new(cookie_header);
//! match engine.authenticate(AuthAttempt::IdentityToken(&transport)).await {
//!     AuthenticationOutcome::Success(principal) => { /* ... */ }
//!     other => { /* ... */ }
//! }
//! ```

pub mod auth;
pub mod config;
pub mod engine;
pub mod errors;
pub mod observability;
pub mod principal;
pub mod transport;

pub use auth::{
    ClaimValue, Claims, IdentityToken, JwksClient, Jwk, KeySet, KeySetProvider,
    SignatureAlgorithm, TokenHeader,
};
pub use config::{AuthConfig, ConfigError};
pub use engine::{
    AuthAttempt, AuthenticationEngine, AuthenticationEngineBuilder, AuthenticationOutcome,
    ReauthenticationReason, RejectionReason,
};
pub use errors::{AuthError, KeySetError, TokenError, TransportError, UnknownRole};
pub use observability::{AuthEvent, AuthObserver, MetricsObserver, OutcomeKind, TracingObserver};
pub use principal::{
    CredentialSource, Principal, PrincipalFactory, Role, RoleResolver, StaticRoleResolver,
};
pub use transport::{
    BearerHeaderTransport, CookieHeaderTransport, StaticTokenTransport, TokenTransport,
};
