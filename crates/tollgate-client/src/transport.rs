//! Refresh endpoint transport.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::ClientConfig;
use crate::credential::AccessCredential;
use crate::error::ClientError;

/// Performs one refresh call against the server.
///
/// The coordinator guarantees at most one call is in flight at a time.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self) -> Result<AccessCredential, ClientError>;
}

/// Token response body shared by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
}

/// Reads a token response, mapping error statuses onto [`ClientError`].
///
/// # Errors
///
/// Returns the client error matching the response status.
pub async fn read_token_response(
    response: reqwest::Response,
) -> Result<AccessCredential, ClientError> {
    let status = response.status();
    if status.is_success() {
        let body: TokenResponse = response.json().await?;
        return Ok(AccessCredential::from_response(
            body.access_token,
            body.expires_in,
        ));
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error_description)
        .unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::BAD_REQUEST => ClientError::MissingCredential,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::unauthorized(message),
        StatusCode::SERVICE_UNAVAILABLE => ClientError::store_unavailable(message),
        _ => ClientError::unexpected_status(status.as_u16(), message),
    })
}

/// Calls the refresh endpoint with a cookie-carrying `reqwest::Client`.
///
/// The refresh credential never passes through this type; it lives in the
/// client's cookie jar, which plays the browser's role.
#[derive(Debug, Clone)]
pub struct HttpRefreshTransport {
    http: reqwest::Client,
    url: Url,
}

impl HttpRefreshTransport {
    #[must_use]
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Builds a transport for the configured refresh endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the refresh path cannot be resolved.
    pub fn from_config(http: reqwest::Client, config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(http, config.endpoint(&config.refresh_path)?))
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self) -> Result<AccessCredential, ClientError> {
        let response = self.http.post(self.url.clone()).send().await?;
        read_token_response(response).await
    }
}
