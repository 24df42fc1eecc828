//! Credential minting, verification and lifecycle.

pub mod jwt;
pub mod service;

pub use jwt::{CodecError, CredentialClaims, CredentialCodec, CredentialKind, IssuedCredential};
pub use service::{IssuedTokens, RefreshedTokens, TokenConfig, TokenService};
