//! Client error types.
//!
//! `ClientError` is `Clone` so a single refresh outcome can be handed to every
//! caller waiting on it.

use std::time::Duration;

/// Errors returned by the session cache, refresh coordinator and interceptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server definitively rejected the session.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The server saw no refresh cookie.
    #[error("No refresh credential present")]
    MissingCredential,

    /// Refresh attempts are on cooldown.
    #[error("Refresh rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Network error: {message}")]
    Network { message: String },

    /// The refresh call did not finish within the configured timeout.
    #[error("Refresh timed out")]
    Timeout,

    /// The server's revocation store is unavailable.
    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A credential or response body could not be parsed.
    #[error("Malformed: {message}")]
    Malformed { message: String },

    /// A rejected request could not be replayed (streaming body).
    #[error("Request cannot be retried: {message}")]
    NotRetryable { message: String },
}

impl ClientError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unexpected_status(status: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_retryable(message: impl Into<String>) -> Self {
        Self::NotRetryable {
            message: message.into(),
        }
    }

    /// Returns `true` if the session cannot be recovered by retrying.
    ///
    /// Terminal failures clear the session cache; transient ones
    /// (network, timeout, store outage, 5xx) leave it in place.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::MissingCredential | Self::Malformed { .. }
        )
    }

    /// Returns `true` for failures that may succeed on a later attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout
                | Self::StoreUnavailable { .. }
                | Self::UnexpectedStatus { .. }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}
