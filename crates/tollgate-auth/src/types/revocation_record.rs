//! Revocation record domain type.
//!
//! One record exists per issued refresh credential. The bearer string is
//! never stored; only its SHA-256 hash is persisted, and verification hashes
//! the presented string and compares.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Why a record was revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// Explicit logout.
    Logout,
    /// Replaced by a fresh refresh credential.
    Rotated,
    /// A rotated credential was replayed; every session of the owner is revoked.
    ReuseDetected,
    /// Oldest session evicted by the per-owner cap.
    Evicted,
    /// Bulk revocation of an owner's sessions.
    OwnerRevoked,
}

impl RevocationReason {
    /// Returns the persisted string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::Rotated => "rotated",
            Self::ReuseDetected => "reuse_detected",
            Self::Evicted => "evicted",
            Self::OwnerRevoked => "owner_revoked",
        }
    }

    /// Parses the persisted string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "logout" => Some(Self::Logout),
            "rotated" => Some(Self::Rotated),
            "reuse_detected" => Some(Self::ReuseDetected),
            "evicted" => Some(Self::Evicted),
            "owner_revoked" => Some(Self::OwnerRevoked),
            _ => None,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort metadata about the client that requested a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMetadata {
    /// Requesting agent string.
    pub user_agent: Option<String>,
    /// Network origin (client address).
    pub origin: Option<String>,
}

/// Persisted, hashed representation of an issued refresh credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationRecord {
    /// Opaque identifier generated at issuance.
    pub id: Uuid,

    /// Subject that owns the credential.
    pub owner: String,

    /// SHA-256 hash of the bearer string.
    pub credential_hash: String,

    /// Requesting agent string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Network origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the credential expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the record was revoked (None = active).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Why the record was revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<RevocationReason>,
}

impl RevocationRecord {
    /// Creates an active record for a freshly minted refresh credential.
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        bearer: &str,
        metadata: OriginMetadata,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            credential_hash: Self::hash_credential(bearer),
            user_agent: metadata.user_agent,
            origin: metadata.origin,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at: None,
            revocation_reason: None,
        }
    }

    /// Returns `true` if the record has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the record has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the record can still authorize a refresh at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }

    /// Returns `true` if `presented` hashes to this record's stored hash.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        verify_hash(&Self::hash_credential(presented), &self.credential_hash)
    }

    /// Hash a bearer string using SHA-256.
    #[must_use]
    pub fn hash_credential(bearer: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(bearer.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Constant-time comparison of two hex hashes.
fn verify_hash(computed: &str, stored: &str) -> bool {
    let (a, b) = (computed.as_bytes(), stored.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn record(expires_in: Duration) -> RevocationRecord {
        RevocationRecord::new(
            "user-1",
            "bearer-value",
            OriginMetadata::default(),
            OffsetDateTime::now_utc() + expires_in,
        )
    }

    #[test]
    fn test_hash_credential() {
        let hash = RevocationRecord::hash_credential("bearer-value");

        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, RevocationRecord::hash_credential("bearer-value"));
        assert_ne!(hash, RevocationRecord::hash_credential("bearer-valuf"));
    }

    #[test]
    fn test_record_never_holds_plaintext() {
        let record = record(Duration::days(1));
        assert_ne!(record.credential_hash, "bearer-value");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("bearer-value"));
    }

    #[test]
    fn test_matches_exact_bearer_only() {
        let bearer = "eyJhbGciOiJIUzI1NiJ9.payload.signature";
        let record = RevocationRecord::new(
            "user-1",
            bearer,
            OriginMetadata::default(),
            OffsetDateTime::now_utc() + Duration::days(1),
        );
        assert!(record.matches(bearer));

        // Every single-character mutation must fail.
        for (i, c) in bearer.char_indices() {
            let replacement = if c == 'x' { 'y' } else { 'x' };
            let mut mutated = bearer.to_string();
            mutated.replace_range(i..i + c.len_utf8(), &replacement.to_string());
            assert!(!record.matches(&mutated), "mutation at {i} matched");
        }
        assert!(!record.matches(&bearer[1..]));
        assert!(!record.matches(&format!("{bearer}x")));
    }

    #[test]
    fn test_active_states() {
        let now = OffsetDateTime::now_utc();

        let active = record(Duration::hours(1));
        assert!(active.is_active_at(now));

        let expired = record(Duration::minutes(-1));
        assert!(expired.is_expired_at(now));
        assert!(!expired.is_active_at(now));

        let mut revoked = record(Duration::hours(1));
        revoked.revoked_at = Some(now);
        revoked.revocation_reason = Some(RevocationReason::Logout);
        assert!(revoked.is_revoked());
        assert!(!revoked.is_active_at(now));
    }

    #[test]
    fn test_reason_string_forms() {
        for reason in [
            RevocationReason::Logout,
            RevocationReason::Rotated,
            RevocationReason::ReuseDetected,
            RevocationReason::Evicted,
            RevocationReason::OwnerRevoked,
        ] {
            assert_eq!(RevocationReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(RevocationReason::parse("bogus"), None);
    }
}
