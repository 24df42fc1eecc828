//! Logout endpoint.
//!
//! Logout is lenient: it revokes the matching record when it can, and
//! always clears both cookies and returns `200`, even when called without a
//! session or when the store is unavailable.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use tracing::{debug, warn};

use super::{cookies, no_store_headers};
use crate::middleware::AuthState;

/// Logout response body.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always `true`.
    pub success: bool,
}

/// Handler for `POST /auth/logout`.
pub async fn logout_handler(State(state): State<AuthState>, jar: CookieJar) -> Response {
    match cookies::read_first(&jar, &state.cookies.refresh_read_names()) {
        Some(presented) => match state.tokens.revoke(&presented).await {
            Ok(true) => {}
            Ok(false) => debug!("Logout presented an unknown or already revoked credential"),
            Err(e) => warn!(error = %e, "Failed to revoke refresh credential during logout"),
        },
        None => debug!("Logout without a refresh cookie"),
    }

    let jar = cookies::clear_credential_cookies(&state.cookies, jar);
    (jar, no_store_headers(), Json(LogoutResponse { success: true })).into_response()
}
