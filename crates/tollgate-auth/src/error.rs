//! Authentication error types.
//!
//! This module defines every error the server side of the credential
//! lifecycle can produce, together with the categories used for logging.

use std::fmt;

use crate::token::jwt::CodecError;

/// Errors that can occur while issuing, refreshing or revoking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The presented credential could not be parsed.
    #[error("Malformed credential: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The credential signature (or issuer) did not verify.
    #[error("Invalid credential signature")]
    SignatureInvalid,

    /// The credential's encoded expiry has passed.
    #[error("Credential expired")]
    Expired,

    /// The credential's revocation record has been revoked.
    #[error("Credential revoked: {message}")]
    Revoked {
        /// Why the credential is no longer usable.
        message: String,
    },

    /// No revocation record matches the presented credential.
    #[error("No matching credential record")]
    NotFound,

    /// The request carried no credential at all.
    #[error("Missing credential: {message}")]
    MissingCredential {
        /// What was expected.
        message: String,
    },

    /// A protected endpoint was called without an access credential.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// What was missing.
        message: String,
    },

    /// The identity verifier rejected the supplied login.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The revocation store could not be reached or failed.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the storage failure.
        message: String,
    },

    /// Minting or persisting a credential pair failed.
    #[error("Credential issuance failed: {message}")]
    IssuanceFailed {
        /// Description of the failure.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Revoked` error.
    #[must_use]
    pub fn revoked(message: impl Into<String>) -> Self {
        Self::Revoked {
            message: message.into(),
        }
    }

    /// Creates a new `MissingCredential` error.
    #[must_use]
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a new `StoreUnavailable` error.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `IssuanceFailed` error.
    #[must_use]
    pub fn issuance_failed(message: impl Into<String>) -> Self {
        Self::IssuanceFailed {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. }
                | Self::SignatureInvalid
                | Self::Expired
                | Self::Revoked { .. }
                | Self::NotFound
                | Self::MissingCredential { .. }
                | Self::Unauthenticated { .. }
                | Self::InvalidCredentials
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::IssuanceFailed { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if the presented credential can never succeed again.
    ///
    /// Terminal errors must not be retried automatically.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. }
                | Self::SignatureInvalid
                | Self::Expired
                | Self::Revoked { .. }
                | Self::NotFound
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Malformed { .. } | Self::SignatureInvalid | Self::Expired => {
                ErrorCategory::Credential
            }
            Self::Revoked { .. } | Self::NotFound => ErrorCategory::Revocation,
            Self::MissingCredential { .. } => ErrorCategory::Validation,
            Self::Unauthenticated { .. } | Self::InvalidCredentials => {
                ErrorCategory::Authentication
            }
            Self::StoreUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::IssuanceFailed { .. } | Self::Internal { .. } => ErrorCategory::Internal,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the machine-readable error code sent to clients.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::Revoked { .. } => "revoked",
            Self::NotFound => "not_found",
            Self::MissingCredential { .. } => "invalid_request",
            Self::Unauthenticated { .. } => "invalid_token",
            Self::InvalidCredentials => "invalid_credentials",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::IssuanceFailed { .. } => "issuance_failed",
            Self::Configuration { .. } | Self::Internal { .. } => "server_error",
        }
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed { message } => Self::Malformed { message },
            CodecError::SignatureInvalid => Self::SignatureInvalid,
            CodecError::Expired => Self::Expired,
            CodecError::Encoding { message } => Self::IssuanceFailed { message },
            CodecError::InvalidKey { message } => Self::Configuration { message },
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The bearer string itself is unusable.
    Credential,
    /// The revocation store rejected the credential.
    Revocation,
    /// The login step failed.
    Authentication,
    /// Request validation errors.
    Validation,
    /// Storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "credential"),
            Self::Revocation => write!(f, "revocation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
