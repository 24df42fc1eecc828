//! Login endpoint.
//!
//! Verifies a username/password pair, issues an access/refresh pair, sets
//! both cookies and returns the access credential in the body.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use super::{AccessTokenResponse, cookies, no_store_headers, origin_metadata};
use crate::error::AuthError;
use crate::middleware::AuthState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Handler for `POST /auth/login`.
///
/// # Errors
///
/// - `InvalidCredentials` (401) if the identity verifier rejects the login
/// - `IssuanceFailed` (500) if the credential pair cannot be persisted
pub async fn login_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let Some(identity) = state
        .verifier
        .verify(&request.username, &request.password)
        .await?
    else {
        debug!(username = %request.username, "Login rejected");
        return Err(AuthError::InvalidCredentials);
    };

    let issued = state
        .tokens
        .issue(&identity, origin_metadata(&headers))
        .await?;

    let refresh_max_age = issued.refresh_expires_at - OffsetDateTime::now_utc();
    let jar = CookieJar::new()
        .add(cookies::access_cookie(
            &state.cookies,
            &issued.access_token,
            Duration::seconds(issued.access_expires_in),
        ))
        .add(cookies::refresh_cookie(
            &state.cookies,
            &issued.refresh_token,
            refresh_max_age,
        ));

    info!(subject = %identity.subject, "Login succeeded");

    Ok((
        jar,
        no_store_headers(),
        Json(AccessTokenResponse::bearer(
            issued.access_token,
            issued.access_expires_in,
        )),
    )
        .into_response())
}
