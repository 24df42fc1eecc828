//! Arc-owning revocation store adapter.
//!
//! Wraps the lifetime-based [`RevocationStorage`] and owns an `Arc<PgPool>`,
//! so it can be used as `Arc<dyn RevocationStore>`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::Postgres;
use time::OffsetDateTime;
use uuid::Uuid;

use tollgate_auth::storage::RevocationStore;
use tollgate_auth::types::{RevocationReason, RevocationRecord};
use tollgate_auth::{AuthError, AuthResult};

use crate::revocation::RevocationStorage;
use crate::{PgPool, StorageError, schema};

/// PostgreSQL-backed [`RevocationStore`].
#[derive(Debug, Clone)]
pub struct PostgresRevocationStore {
    pool: Arc<PgPool>,
}

impl PostgresRevocationStore {
    /// Create a store with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a store by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PoolOptions::<Postgres>::new().connect(database_url).await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the revocation table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        schema::ensure_schema(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn storage(&self) -> RevocationStorage<'_> {
        RevocationStorage::new(&self.pool)
    }
}

#[async_trait]
impl RevocationStore for PostgresRevocationStore {
    async fn insert(&self, record: &RevocationRecord) -> AuthResult<()> {
        Ok(self.storage().insert(record).await?)
    }

    async fn find_active_by_owner(
        &self,
        owner: &str,
        now: OffsetDateTime,
    ) -> AuthResult<Vec<RevocationRecord>> {
        self.storage()
            .find_active_by_owner(owner, now)
            .await?
            .into_iter()
            .map(|row| row.into_record().map_err(AuthError::from))
            .collect()
    }

    async fn find_by_hash(&self, credential_hash: &str) -> AuthResult<Option<RevocationRecord>> {
        match self.storage().find_by_hash(credential_hash).await? {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> AuthResult<bool> {
        Ok(self.storage().revoke(id, reason, now).await?)
    }

    async fn revoke_all_for_owner(
        &self,
        owner: &str,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> AuthResult<u64> {
        Ok(self.storage().revoke_all_for_owner(owner, reason, now).await?)
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let removed = self.storage().cleanup_expired(now).await?;
        if removed > 0 {
            tracing::debug!(removed, "Deleted expired revocation records");
        }
        Ok(removed)
    }
}
