//! Refresh endpoint.
//!
//! Reads the refresh credential from its cookie only; the request has no
//! body. Every 4xx rejection clears both credential cookies so a rejected
//! client does not keep resending a dead refresh cookie. 5xx failures leave
//! cookies untouched.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::{AccessTokenResponse, cookies, no_store_headers, origin_metadata};
use crate::error::AuthError;
use crate::middleware::AuthState;

/// Handler for `POST /auth/refresh`.
///
/// - `200` with a new access credential and access cookie (plus a rotated
///   refresh cookie when rotation is enabled)
/// - `400` if no refresh cookie is present
/// - `401` with cleared cookies if the credential is invalid, expired or revoked
pub async fn refresh_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let Some(presented) = cookies::read_first(&jar, &state.cookies.refresh_read_names()) else {
        debug!("Refresh attempted without a refresh cookie");
        return reject(&state, jar, AuthError::missing_credential("no refresh cookie"));
    };

    let refreshed = match state
        .tokens
        .refresh(&presented, origin_metadata(&headers))
        .await
    {
        Ok(refreshed) => refreshed,
        Err(e) => return reject(&state, jar, e),
    };

    let mut jar = jar.add(cookies::access_cookie(
        &state.cookies,
        &refreshed.access_token,
        Duration::seconds(refreshed.access_expires_in),
    ));
    if let Some(rotated) = &refreshed.refresh_token {
        let max_age = refreshed.refresh_expires_at - OffsetDateTime::now_utc();
        jar = jar.add(cookies::refresh_cookie(&state.cookies, rotated, max_age));
    }

    (
        jar,
        no_store_headers(),
        Json(AccessTokenResponse::bearer(
            refreshed.access_token,
            refreshed.access_expires_in,
        )),
    )
        .into_response()
}

fn reject(state: &AuthState, jar: CookieJar, error: AuthError) -> Response {
    if error.is_client_error() {
        debug!(error = %error, category = %error.category(), "Refresh rejected");
        let jar = cookies::clear_credential_cookies(&state.cookies, jar);
        (jar, error).into_response()
    } else {
        warn!(error = %error, category = %error.category(), "Refresh failed");
        error.into_response()
    }
}
