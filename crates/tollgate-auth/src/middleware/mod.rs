//! Authentication middleware for protected endpoints.
//!
//! - [`BearerAuth`] - extractor validating the access credential
//! - [`AuthState`] - state shared with the auth endpoints
//! - [`AuthContext`] - authenticated request context
//!
//! `AuthError` implements `IntoResponse` in [`error`].

pub mod auth;
pub mod error;
pub mod types;

pub use auth::{AuthState, BearerAuth};
pub use types::AuthContext;
