//! Revocation record queries.
//!
//! Records are stored hashed; the revoke statement is conditioned on
//! `revoked_at IS NULL` so concurrent revokes of one record have a single
//! winner.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use tollgate_auth::types::{RevocationReason, RevocationRecord};

use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

type RowTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
    Option<OffsetDateTime>,
    Option<String>,
);

const COLUMNS: &str = "id, owner, credential_hash, user_agent, origin, \
                       created_at, expires_at, revoked_at, revocation_reason";

/// Revocation record row from the database.
#[derive(Debug, Clone)]
pub struct RevocationRow {
    pub id: Uuid,
    pub owner: String,
    pub credential_hash: String,
    pub user_agent: Option<String>,
    pub origin: Option<String>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
    pub revocation_reason: Option<String>,
}

impl RevocationRow {
    /// Create from database tuple.
    fn from_tuple(row: RowTuple) -> Self {
        Self {
            id: row.0,
            owner: row.1,
            credential_hash: row.2,
            user_agent: row.3,
            origin: row.4,
            created_at: row.5,
            expires_at: row.6,
            revoked_at: row.7,
            revocation_reason: row.8,
        }
    }

    /// Converts the row into the domain record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRow` if the stored reason is unknown.
    pub fn into_record(self) -> StorageResult<RevocationRecord> {
        let revocation_reason = match self.revocation_reason {
            Some(reason) => Some(RevocationReason::parse(&reason).ok_or_else(|| {
                StorageError::invalid_row(format!(
                    "unknown revocation reason '{reason}' on record {}",
                    self.id
                ))
            })?),
            None => None,
        };

        Ok(RevocationRecord {
            id: self.id,
            owner: self.owner,
            credential_hash: self.credential_hash,
            user_agent: self.user_agent,
            origin: self.origin,
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            revocation_reason,
        })
    }
}

// =============================================================================
// Revocation Storage
// =============================================================================

/// Revocation record queries against a borrowed pool.
pub struct RevocationStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> RevocationStorage<'a> {
    /// Create a new revocation storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` on a duplicate id or hash, or a database error.
    pub async fn insert(&self, record: &RevocationRecord) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO revocation_record
                (id, owner, credential_hash, user_agent, origin,
                 created_at, expires_at, revoked_at, revocation_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.owner)
        .bind(&record.credential_hash)
        .bind(&record.user_agent)
        .bind(&record.origin)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .bind(record.revocation_reason.map(|r| r.as_str()))
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::conflict(format!(
                    "revocation record {} already exists",
                    record.id
                ));
            }
            StorageError::from(e)
        })?;

        Ok(())
    }

    /// Find non-revoked, unexpired records of an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active_by_owner(
        &self,
        owner: &str,
        now: OffsetDateTime,
    ) -> StorageResult<Vec<RevocationRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM revocation_record \
             WHERE owner = $1 AND revoked_at IS NULL AND expires_at > $2"
        );
        let rows: Vec<RowTuple> = query_as(&sql)
            .bind(owner)
            .bind(now)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(RevocationRow::from_tuple).collect())
    }

    /// Find a record by credential hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_hash(&self, credential_hash: &str) -> StorageResult<Option<RevocationRow>> {
        let sql = format!("SELECT {COLUMNS} FROM revocation_record WHERE credential_hash = $1");
        let row: Option<RowTuple> = query_as(&sql)
            .bind(credential_hash)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(RevocationRow::from_tuple))
    }

    /// Revoke a record if it is not revoked yet.
    ///
    /// Returns `true` if this call revoked it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> StorageResult<bool> {
        let result = query(
            r#"
            UPDATE revocation_record
            SET revoked_at = $2, revocation_reason = $3
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(reason.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revoke every non-revoked record of an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_all_for_owner(
        &self,
        owner: &str,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> StorageResult<u64> {
        let result = query(
            r#"
            UPDATE revocation_record
            SET revoked_at = $2, revocation_reason = $3
            WHERE owner = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(owner)
        .bind(now)
        .bind(reason.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete records past expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self, now: OffsetDateTime) -> StorageResult<u64> {
        let result = query("DELETE FROM revocation_record WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
