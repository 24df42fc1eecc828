//! Revocation store trait.
//!
//! # Security Considerations
//!
//! - Records hold SHA-256 hashes only, never bearer strings
//! - `revoke` is a compare-and-set: of two concurrent calls on the same
//!   active record exactly one returns `true`
//! - Expired records should be cleaned up periodically

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{RevocationReason, RevocationRecord};

/// Storage trait for revocation records.
///
/// # Implementations
///
/// - [`crate::storage::InMemoryRevocationStore`] - process-local, for tests and single-node use
/// - `tollgate-auth-postgres` - PostgreSQL storage backend
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    async fn insert(&self, record: &RevocationRecord) -> AuthResult<()>;

    /// Returns the records of `owner` that are not revoked and not expired at `now`.
    ///
    /// Order is unspecified; callers must examine every candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_active_by_owner(
        &self,
        owner: &str,
        now: OffsetDateTime,
    ) -> AuthResult<Vec<RevocationRecord>>;

    /// Finds a record by credential hash regardless of its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, credential_hash: &str) -> AuthResult<Option<RevocationRecord>>;

    /// Marks a record revoked if, and only if, it is not revoked yet.
    ///
    /// Returns `true` when this call set `revoked_at`, `false` when the record
    /// was already revoked or does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> AuthResult<bool>;

    /// Revokes every non-revoked record of `owner`.
    ///
    /// Returns the number of records revoked by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_all_for_owner(
        &self,
        owner: &str,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> AuthResult<u64>;

    /// Deletes records whose expiry is at or before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
