//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;

/// Configuration for [`AuthenticatedClient`](crate::AuthenticatedClient) and
/// [`RefreshCoordinator`](crate::RefreshCoordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the server; endpoint paths are joined onto it.
    pub base_url: Url,

    /// Login endpoint path (default: `/auth/login`).
    pub login_path: String,

    /// Refresh endpoint path (default: `/auth/refresh`).
    pub refresh_path: String,

    /// Logout endpoint path (default: `/auth/logout`).
    pub logout_path: String,

    /// Upper bound for one refresh call (default: 30 seconds).
    #[serde(with = "humantime_serde")]
    pub refresh_timeout: Duration,

    /// Refresh attempts allowed per cooldown window (default: 1).
    pub max_refresh_attempts: u32,

    /// Cooldown window for the refresh rate limit (default: 30 seconds).
    #[serde(with = "humantime_serde")]
    pub refresh_cooldown: Duration,

    /// A cached credential this close to expiry is treated as expired (default: 5 seconds).
    #[serde(with = "humantime_serde")]
    pub expiry_margin: Duration,

    /// Access cookie names checked when bootstrapping, in priority order.
    pub access_cookie_names: Vec<String>,

    /// Capacity of the session event channel (default: 64).
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8080").expect("default base URL is valid"),
            login_path: "/auth/login".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            logout_path: "/auth/logout".to_string(),
            refresh_timeout: Duration::from_secs(30),
            max_refresh_attempts: 1,
            refresh_cooldown: Duration::from_secs(30),
            expiry_margin: Duration::from_secs(5),
            access_cookie_names: vec![
                "__Host-tollgate_access".to_string(),
                "tollgate_access".to_string(),
                "access_token".to_string(),
            ],
            event_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given server.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Sets the refresh timeout.
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Sets the refresh rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, max_attempts: u32, cooldown: Duration) -> Self {
        self.max_refresh_attempts = max_attempts;
        self.refresh_cooldown = cooldown;
        self
    }

    /// Sets the expiry margin.
    #[must_use]
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Sets the access cookie names read during bootstrap.
    #[must_use]
    pub fn with_access_cookie_names(mut self, names: Vec<String>) -> Self {
        self.access_cookie_names = names;
        self
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::malformed(format!("invalid endpoint path '{path}': {e}")))
    }

    /// Returns `true` if the URL targets the login, refresh or logout endpoint.
    #[must_use]
    pub fn is_auth_endpoint(&self, url: &Url) -> bool {
        [&self.login_path, &self.refresh_path, &self.logout_path]
            .into_iter()
            .filter_map(|path| self.endpoint(path).ok())
            .any(|endpoint| endpoint.origin() == url.origin() && endpoint.path() == url.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.refresh_timeout, Duration::from_secs(30));
        assert_eq!(config.max_refresh_attempts, 1);
        assert_eq!(config.refresh_cooldown, Duration::from_secs(30));
        assert_eq!(config.refresh_path, "/auth/refresh");
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new(Url::parse("https://api.example.com").unwrap())
            .with_refresh_timeout(Duration::from_secs(5))
            .with_rate_limit(3, Duration::from_secs(10))
            .with_expiry_margin(Duration::ZERO);

        assert_eq!(config.base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.refresh_timeout, Duration::from_secs(5));
        assert_eq!(config.max_refresh_attempts, 3);
        assert_eq!(config.refresh_cooldown, Duration::from_secs(10));
        assert_eq!(config.expiry_margin, Duration::ZERO);
    }

    #[test]
    fn test_is_auth_endpoint() {
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:9000").unwrap());

        let refresh = Url::parse("http://127.0.0.1:9000/auth/refresh").unwrap();
        let logout = Url::parse("http://127.0.0.1:9000/auth/logout?next=/").unwrap();
        let api = Url::parse("http://127.0.0.1:9000/api/me").unwrap();

        assert!(config.is_auth_endpoint(&refresh));
        assert!(config.is_auth_endpoint(&logout));
        assert!(!config.is_auth_endpoint(&api));

        let other_host = Url::parse("http://evil.example.com/auth/refresh").unwrap();
        let other_port = Url::parse("http://127.0.0.1:9001/auth/refresh").unwrap();
        assert!(!config.is_auth_endpoint(&other_host));
        assert!(!config.is_auth_endpoint(&other_port));
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "http://localhost:3000", "refresh_cooldown": "1m"}"#,
        )
        .unwrap();
        assert_eq!(config.refresh_cooldown, Duration::from_secs(60));
        assert_eq!(config.max_refresh_attempts, 1);
    }
}
