//! PostgreSQL storage backend for Tollgate revocation records.
//!
//! # Example
//!
//! ```ignore
//! use tollgate_auth_postgres::PostgresRevocationStore;
//!
//! let store = PostgresRevocationStore::connect("postgres://localhost/tollgate").await?;
//! store.ensure_schema().await?;
//! let tokens = TokenService::from_config(&config, Arc::new(store))?;
//! ```

pub mod revocation;
pub mod schema;
pub mod store;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

use tollgate_auth::AuthError;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use revocation::{RevocationRow, RevocationStorage};
pub use store::PostgresRevocationStore;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during revocation storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Record already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back to a record.
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidRow` error.
    #[must_use]
    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow(message.into())
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database(e) => AuthError::store_unavailable(e.to_string()),
            StorageError::Conflict(message) | StorageError::InvalidRow(message) => {
                AuthError::internal(message)
            }
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_conversion() {
        let err = AuthError::from(StorageError::Database(sqlx_core::Error::PoolTimedOut));
        assert!(matches!(err, AuthError::StoreUnavailable { .. }));

        let err = AuthError::from(StorageError::conflict("duplicate id"));
        assert!(matches!(err, AuthError::Internal { .. }));
    }

    #[test]
    fn test_storage_error_predicates() {
        assert!(StorageError::Database(sqlx_core::Error::PoolClosed).is_database_error());
        assert!(StorageError::conflict("x").is_conflict());
        assert!(!StorageError::invalid_row("x").is_conflict());
    }
}
