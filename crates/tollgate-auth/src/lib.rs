//! # tollgate-auth
//!
//! Server side of the Tollgate credential lifecycle.
//!
//! This crate provides:
//! - A credential codec for short-lived access and long-lived refresh credentials
//! - A revocation store holding only hashes of issued refresh credentials
//! - Issuance, refresh (with optional rotation and reuse detection) and revocation
//! - Axum handlers for login, refresh and logout, with cookie transport
//! - A bearer extractor for protected endpoints
//!
//! ## Modules
//!
//! - [`config`] - Credential lifecycle configuration
//! - [`token`] - Credential codec and token service
//! - [`storage`] - Revocation store trait and in-memory implementation
//! - [`types`] - Revocation record domain types
//! - [`identity`] - Identity verification for logins
//! - [`http`] - Axum handlers for the auth endpoints
//! - [`middleware`] - Bearer authentication for protected endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod middleware;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, CookieConfig, RotationConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{auth_router, login_handler, logout_handler, refresh_handler};
pub use identity::{IdentityVerifier, StaticIdentityVerifier, StaticUser, VerifiedIdentity};
pub use middleware::{AuthContext, AuthState, BearerAuth};
pub use storage::{InMemoryRevocationStore, RevocationStore};
pub use token::{
    CodecError, CredentialClaims, CredentialCodec, CredentialKind, IssuedTokens, RefreshedTokens,
    TokenConfig, TokenService,
};
pub use types::{OriginMetadata, RevocationReason, RevocationRecord};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tollgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, CookieConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::identity::{IdentityVerifier, VerifiedIdentity};
    pub use crate::middleware::{AuthContext, AuthState, BearerAuth};
    pub use crate::storage::{InMemoryRevocationStore, RevocationStore};
    pub use crate::token::{CredentialCodec, CredentialKind, TokenService};
    pub use crate::types::{OriginMetadata, RevocationReason, RevocationRecord};
}
