//! In-memory revocation store.
//!
//! Records live in a `DashMap` keyed by id, with a secondary hash index.
//! The per-shard write lock taken by `get_mut` makes `revoke` a
//! compare-and-set without any extra locking.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::storage::RevocationStore;
use crate::types::{RevocationReason, RevocationRecord};

/// Process-local revocation store.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    records: DashMap<Uuid, RevocationRecord>,
    by_hash: DashMap<String, Uuid>,
}

impl InMemoryRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, revoked or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a snapshot of a record by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<RevocationRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn insert(&self, record: &RevocationRecord) -> AuthResult<()> {
        self.by_hash
            .insert(record.credential_hash.clone(), record.id);
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_active_by_owner(
        &self,
        owner: &str,
        now: OffsetDateTime,
    ) -> AuthResult<Vec<RevocationRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.owner == owner && r.is_active_at(now))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn find_by_hash(&self, credential_hash: &str) -> AuthResult<Option<RevocationRecord>> {
        let Some(id) = self.by_hash.get(credential_hash).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.get(id))
    }

    async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> AuthResult<bool> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        if record.revoked_at.is_some() {
            return Ok(false);
        }
        record.revoked_at = Some(now);
        record.revocation_reason = Some(reason);
        Ok(true)
    }

    async fn revoke_all_for_owner(
        &self,
        owner: &str,
        reason: RevocationReason,
        now: OffsetDateTime,
    ) -> AuthResult<u64> {
        let mut count = 0;
        for mut record in self.records.iter_mut() {
            if record.owner == owner && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                record.revocation_reason = Some(reason);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let expired: Vec<(Uuid, String)> = self
            .records
            .iter()
            .filter(|r| r.is_expired_at(now))
            .map(|r| (r.id, r.credential_hash.clone()))
            .collect();

        let mut count = 0;
        for (id, hash) in expired {
            if self.records.remove(&id).is_some() {
                self.by_hash.remove(&hash);
                count += 1;
            }
        }
        Ok(count)
    }
}
