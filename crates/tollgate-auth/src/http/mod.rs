//! HTTP handlers for the credential lifecycle endpoints.
//!
//! # Available Handlers
//!
//! - [`login_handler`] - `POST /auth/login`
//! - [`refresh_handler`] - `POST /auth/refresh`
//! - [`logout_handler`] - `POST /auth/logout`
//!
//! # Usage
//!
//! ```ignore
//! use tollgate_auth::http::auth_router;
//!
//! let app = Router::new()
//!     .merge(auth_router())
//!     .with_state(app_state);
//! ```

pub mod cookies;
pub mod login;
pub mod logout;
pub mod refresh;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderMap, HeaderValue, header},
    routing::post,
};
use serde::Serialize;

pub use login::{LoginRequest, login_handler};
pub use logout::{LogoutResponse, logout_handler};
pub use refresh::refresh_handler;

use crate::middleware::AuthState;
use crate::types::OriginMetadata;

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/auth/login";
/// Path of the refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";
/// Path of the logout endpoint.
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Builds the router for the login, refresh and logout endpoints.
pub fn auth_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AuthState: FromRef<S>,
{
    Router::new()
        .route(LOGIN_PATH, post(login_handler))
        .route(REFRESH_PATH, post(refresh_handler))
        .route(LOGOUT_PATH, post(logout_handler))
}

/// Body returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    /// Access bearer string.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

impl AccessTokenResponse {
    pub(crate) fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer",
            expires_in,
        }
    }
}

/// Headers that keep credential responses out of caches.
pub(crate) fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Collects best-effort origin metadata from request headers.
#[must_use]
pub fn origin_metadata(headers: &HeaderMap) -> OriginMetadata {
    OriginMetadata {
        user_agent: extract_user_agent(headers),
        origin: extract_ip_address(headers),
    }
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    // X-Forwarded-For is "client, proxy1, proxy2"; the first entry is the client.
    if let Some(client_ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(client_ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
