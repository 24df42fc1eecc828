//! Request interceptor.
//!
//! [`AuthenticatedClient`] attaches the current access credential to every
//! outbound request. On a 401 it asks the coordinator for a replacement and
//! replays the request exactly once; a second 401 ends the session. Calls to
//! the login, refresh and logout endpoints bypass this entirely.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::coordinator::RefreshCoordinator;
use crate::credential::AccessCredential;
use crate::error::ClientError;
use crate::transport::{HttpRefreshTransport, read_token_response};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// HTTP client with transparent access credential handling.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    coordinator: RefreshCoordinator,
    config: Arc<ClientConfig>,
}

impl AuthenticatedClient {
    /// Creates a client with its own cookie jar and an HTTP refresh transport
    /// sharing that jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or an endpoint
    /// path is invalid.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()?;
        let transport = HttpRefreshTransport::from_config(http.clone(), &config)?;
        let coordinator = RefreshCoordinator::new(Arc::new(transport), config.clone());
        Ok(Self::with_parts(http, coordinator, config))
    }

    /// Assembles a client from existing parts.
    #[must_use]
    pub fn with_parts(
        http: reqwest::Client,
        coordinator: RefreshCoordinator,
        config: ClientConfig,
    ) -> Self {
        Self {
            http,
            coordinator,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts a request to a path relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the path cannot be joined.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.request(method, self.config.endpoint(path)?))
    }

    /// Logs in and installs the returned access credential.
    ///
    /// The refresh cookie set by the server stays in the cookie jar.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the login is rejected.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessCredential, ClientError> {
        let response = self
            .http
            .post(self.config.endpoint(&self.config.login_path)?)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let credential = read_token_response(response).await?;
        self.coordinator.set_credential(credential.clone());
        debug!("Logged in");
        Ok(credential)
    }

    /// Logs out on the server and clears the local session.
    ///
    /// The local session is cleared even if the server call fails.
    ///
    /// # Errors
    ///
    /// Returns the network or status error of the server call.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = async {
            let response = self
                .http
                .post(self.config.endpoint(&self.config.logout_path)?)
                .send()
                .await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ClientError::unexpected_status(
                    status.as_u16(),
                    "logout failed",
                ))
            }
        }
        .await;

        self.coordinator.logout();
        result
    }

    /// Sends a request with the access credential attached.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the request is rejected after one refresh,
    /// or the error of the refresh that preceded the retry.
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        if self.config.is_auth_endpoint(request.url()) {
            let response = self.http.execute(request).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(ClientError::unauthorized("authentication endpoint rejected the request"));
            }
            return Ok(response);
        }

        let credential = self.coordinator.ensure_access_credential().await?;
        let retry = request.try_clone();
        let response = self
            .http
            .execute(with_bearer(request, &credential)?)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(retry) = retry else {
            return Err(ClientError::not_retryable(
                "request body cannot be replayed after refresh",
            ));
        };

        debug!(url = %retry.url(), "Request rejected, refreshing once");
        let refreshed = self
            .coordinator
            .refresh_after_rejection(credential.token())
            .await?;

        let response = self.http.execute(with_bearer(retry, &refreshed)?).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "Request rejected after refresh");
            self.coordinator.invalidate("request rejected after refresh");
            return Err(ClientError::unauthorized(
                "request rejected after refresh",
            ));
        }

        Ok(response)
    }

    /// Builds and sends a request with the access credential attached.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus build failures.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let request = builder.build()?;
        self.execute(request).await
    }
}

fn with_bearer(mut request: Request, credential: &AccessCredential) -> Result<Request, ClientError> {
    let value = HeaderValue::from_str(&format!("Bearer {}", credential.token()))
        .map_err(|e| ClientError::malformed(format!("invalid access credential: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}
