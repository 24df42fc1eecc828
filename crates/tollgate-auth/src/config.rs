//! Credential lifecycle configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://auth.example.com"
//! access_token_lifetime = "15m"
//! refresh_token_lifetime = "30d"
//!
//! [auth.rotation]
//! enabled = true
//! reuse_grace = "5m"
//!
//! [auth.cookies]
//! secure = true
//! host_locked = true
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::token::jwt::MIN_SECRET_LEN;

/// Root configuration for credential issuance, refresh and revocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer written to (and required in) every credential.
    pub issuer: String,

    /// Lifetime of access credentials.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Lifetime of refresh credentials.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Clock-skew tolerance applied to expiry checks.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Refresh credential rotation.
    pub rotation: RotationConfig,

    /// Maximum number of active refresh credentials per owner.
    /// `None` leaves the count unbounded.
    pub max_sessions_per_owner: Option<usize>,

    /// HMAC signing secrets.
    pub signing: SigningConfig,

    /// Cookie transport.
    pub cookies: CookieConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            access_token_lifetime: Duration::from_secs(15 * 60),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
            leeway: Duration::ZERO,
            rotation: RotationConfig::default(),
            max_sessions_per_owner: None,
            signing: SigningConfig::default(),
            cookies: CookieConfig::default(),
        }
    }
}

/// Refresh credential rotation policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Revoke the presented refresh credential and issue a new one on every refresh.
    pub enabled: bool,

    /// Revoke every session of an owner when an already-rotated credential is replayed.
    pub reuse_detection: bool,

    /// Window after rotation in which a replay is treated as a benign race.
    ///
    /// Should exceed a client's refresh timeout plus its refresh cooldown,
    /// otherwise a retry after a lost refresh response counts as reuse.
    #[serde(with = "humantime_serde")]
    pub reuse_grace: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reuse_detection: true,
            reuse_grace: Duration::from_secs(300),
        }
    }
}

/// HMAC secrets for the two credential classes.
///
/// When a secret is absent an ephemeral one is generated at startup;
/// credentials then do not survive a restart.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Secret for access credentials.
    pub access_secret: Option<String>,

    /// Secret for refresh credentials.
    pub refresh_secret: Option<String>,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("access_secret", &self.access_secret.as_ref().map(|_| "<redacted>"))
            .field("refresh_secret", &self.refresh_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SigningConfig {
    /// Returns the configured secrets, generating random ones for any that are missing.
    #[must_use]
    pub fn resolve(&self) -> (Vec<u8>, Vec<u8>) {
        let access = match &self.access_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!("No access signing secret configured, generating an ephemeral one");
                generate_secret()
            }
        };
        let refresh = match &self.refresh_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!("No refresh signing secret configured, generating an ephemeral one");
                generate_secret()
            }
        };
        (access, refresh)
    }
}

fn generate_secret() -> Vec<u8> {
    let mut bytes = vec![0u8; 64];
    rand::Rng::fill(&mut rand::thread_rng(), bytes.as_mut_slice());
    bytes
}

/// `SameSite` attribute written on credential cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

/// Cookie names and attributes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Preferred access cookie name (without the `__Host-` prefix).
    pub access_name: String,

    /// Preferred refresh cookie name (without the `__Host-` prefix).
    pub refresh_name: String,

    /// Older access cookie names still accepted when reading.
    pub legacy_access_names: Vec<String>,

    /// Older refresh cookie names still accepted when reading.
    pub legacy_refresh_names: Vec<String>,

    /// Mark cookies `Secure`. Disable only for plain-HTTP development.
    pub secure: bool,

    /// Use the `__Host-` prefix. Only honored when `secure` is set.
    pub host_locked: bool,

    /// `SameSite` attribute.
    pub same_site: SameSitePolicy,

    /// Cookie path.
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_name: "tollgate_access".to_string(),
            refresh_name: "tollgate_refresh".to_string(),
            legacy_access_names: vec!["access_token".to_string()],
            legacy_refresh_names: vec!["refresh_token".to_string()],
            secure: true,
            host_locked: true,
            same_site: SameSitePolicy::Strict,
            path: "/".to_string(),
        }
    }
}

impl CookieConfig {
    fn prefixed(&self, name: &str) -> String {
        if self.secure && self.host_locked {
            format!("__Host-{name}")
        } else {
            name.to_string()
        }
    }

    /// Name the access cookie is written under.
    #[must_use]
    pub fn access_cookie_name(&self) -> String {
        self.prefixed(&self.access_name)
    }

    /// Name the refresh cookie is written under.
    #[must_use]
    pub fn refresh_cookie_name(&self) -> String {
        self.prefixed(&self.refresh_name)
    }

    /// Access cookie names in read priority order.
    #[must_use]
    pub fn access_read_names(&self) -> Vec<String> {
        read_names(
            self.access_cookie_name(),
            &self.access_name,
            &self.legacy_access_names,
        )
    }

    /// Refresh cookie names in read priority order.
    #[must_use]
    pub fn refresh_read_names(&self) -> Vec<String> {
        read_names(
            self.refresh_cookie_name(),
            &self.refresh_name,
            &self.legacy_refresh_names,
        )
    }
}

fn read_names(preferred: String, bare: &str, legacy: &[String]) -> Vec<String> {
    let mut names = vec![preferred];
    for name in std::iter::once(bare).chain(legacy.iter().map(String::as_str)) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - A lifetime is zero, or the refresh lifetime does not exceed the access lifetime
    /// - A configured secret is shorter than 32 bytes, or both secrets are equal
    /// - The session cap is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.access_token_lifetime.is_zero() || self.refresh_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be > 0".to_string(),
            ));
        }

        if self.refresh_token_lifetime <= self.access_token_lifetime {
            return Err(ConfigError::InvalidValue(
                "refresh_token_lifetime must exceed access_token_lifetime".to_string(),
            ));
        }

        for (name, secret) in [
            ("access_secret", &self.signing.access_secret),
            ("refresh_secret", &self.signing.refresh_secret),
        ] {
            if secret.as_ref().is_some_and(|s| s.len() < MIN_SECRET_LEN) {
                return Err(ConfigError::InvalidValue(format!(
                    "signing.{name} must be at least {MIN_SECRET_LEN} bytes"
                )));
            }
        }

        if self.signing.access_secret.is_some()
            && self.signing.access_secret == self.signing.refresh_secret
        {
            return Err(ConfigError::InvalidValue(
                "signing.access_secret and signing.refresh_secret must differ".to_string(),
            ));
        }

        if self.max_sessions_per_owner == Some(0) {
            return Err(ConfigError::InvalidValue(
                "max_sessions_per_owner must be > 0".to_string(),
            ));
        }

        if self.cookies.access_name.is_empty() || self.cookies.refresh_name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "cookie names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
