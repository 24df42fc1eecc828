//! Token service: issuance, refresh and revocation.
//!
//! This module ties the [`CredentialCodec`] to a [`RevocationStore`]:
//!
//! - Issuance mints an access/refresh pair and persists the refresh hash
//! - Refresh verifies a presented refresh credential against the store and
//!   mints a replacement access credential (rotating the refresh credential
//!   when configured)
//! - Revocation marks the matching record revoked
//!
//! # Usage
//!
//! ```ignore
//! use tollgate_auth::token::{TokenService, TokenConfig};
//!
//! let service = TokenService::new(codec, store, TokenConfig::default());
//! let issued = service.issue(&identity, OriginMetadata::default()).await?;
//! let refreshed = service.refresh(&issued.refresh_token, OriginMetadata::default()).await?;
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::VerifiedIdentity;
use crate::storage::RevocationStore;
use crate::token::jwt::{CredentialClaims, CredentialCodec, CredentialKind};
use crate::types::{OriginMetadata, RevocationReason, RevocationRecord};

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access credential lifetime.
    pub access_token_lifetime: Duration,

    /// Refresh credential lifetime.
    pub refresh_token_lifetime: Duration,

    /// Whether to rotate refresh credentials on use.
    /// When true, the old record is revoked and a new credential is issued
    /// that keeps the original expiry.
    pub rotate_refresh_tokens: bool,

    /// Revoke all sessions of an owner when a rotated credential is replayed.
    pub reuse_detection: bool,

    /// Replays within this window after rotation are not treated as reuse.
    pub reuse_grace: Duration,

    /// Maximum active refresh credentials per owner.
    pub max_sessions_per_owner: Option<usize>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::minutes(15),
            refresh_token_lifetime: Duration::days(30),
            rotate_refresh_tokens: true,
            reuse_detection: true,
            reuse_grace: Duration::minutes(5),
            max_sessions_per_owner: None,
        }
    }
}

impl TokenConfig {
    /// Builds the service configuration from [`AuthConfig`].
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a duration does not fit the token clock.
    pub fn from_auth_config(config: &AuthConfig) -> AuthResult<Self> {
        let convert = |name: &str, d: std::time::Duration| {
            Duration::try_from(d)
                .map_err(|e| AuthError::configuration(format!("{name} out of range: {e}")))
        };

        Ok(Self {
            access_token_lifetime: convert("access_token_lifetime", config.access_token_lifetime)?,
            refresh_token_lifetime: convert(
                "refresh_token_lifetime",
                config.refresh_token_lifetime,
            )?,
            rotate_refresh_tokens: config.rotation.enabled,
            reuse_detection: config.rotation.reuse_detection,
            reuse_grace: convert("rotation.reuse_grace", config.rotation.reuse_grace)?,
            max_sessions_per_owner: config.max_sessions_per_owner,
        })
    }

    /// Sets the access credential lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh credential lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Sets whether to rotate refresh credentials on use.
    #[must_use]
    pub fn with_rotate_refresh_tokens(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }

    /// Sets the reuse grace window.
    #[must_use]
    pub fn with_reuse_grace(mut self, grace: Duration) -> Self {
        self.reuse_grace = grace;
        self
    }

    /// Sets the per-owner session cap.
    #[must_use]
    pub fn with_max_sessions_per_owner(mut self, max: Option<usize>) -> Self {
        self.max_sessions_per_owner = max;
        self
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Access bearer string.
    pub access_token: String,

    /// Access credential lifetime in seconds.
    pub access_expires_in: i64,

    /// Refresh bearer string. Only ever placed in an http-only cookie.
    pub refresh_token: String,

    /// Refresh credential expiry.
    pub refresh_expires_at: OffsetDateTime,

    /// Id of the revocation record created for the refresh credential.
    pub record_id: Uuid,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    /// New access bearer string.
    pub access_token: String,

    /// Access credential lifetime in seconds.
    pub access_expires_in: i64,

    /// Replacement refresh credential, present when rotation is enabled.
    pub refresh_token: Option<String>,

    /// Expiry of the refresh credential now in force.
    pub refresh_expires_at: OffsetDateTime,
}

/// Issues, refreshes and revokes credentials.
pub struct TokenService {
    /// Codec for both credential classes.
    codec: Arc<CredentialCodec>,

    /// Revocation record storage.
    store: Arc<dyn RevocationStore>,

    /// Service configuration.
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        codec: Arc<CredentialCodec>,
        store: Arc<dyn RevocationStore>,
        config: TokenConfig,
    ) -> Self {
        Self {
            codec,
            store,
            config,
        }
    }

    /// Builds a service from [`AuthConfig`], resolving signing secrets.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration or secrets are invalid.
    pub fn from_config(config: &AuthConfig, store: Arc<dyn RevocationStore>) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let (access_secret, refresh_secret) = config.signing.resolve();
        let codec = CredentialCodec::new(&access_secret, &refresh_secret, config.issuer.clone())?
            .with_leeway(config.leeway);

        Ok(Self::new(
            Arc::new(codec),
            store,
            TokenConfig::from_auth_config(config)?,
        ))
    }

    /// Mints an access/refresh pair for a verified identity.
    ///
    /// Both credentials are minted before anything is persisted, so a minting
    /// failure leaves no record behind.
    ///
    /// # Errors
    ///
    /// Returns `IssuanceFailed` if minting or persisting fails.
    pub async fn issue(
        &self,
        identity: &VerifiedIdentity,
        metadata: OriginMetadata,
    ) -> AuthResult<IssuedTokens> {
        let access = self
            .codec
            .issue(
                CredentialKind::Access,
                &identity.subject,
                &identity.role,
                self.config.access_token_lifetime,
            )
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;
        let refresh = self
            .codec
            .issue(
                CredentialKind::Refresh,
                &identity.subject,
                &identity.role,
                self.config.refresh_token_lifetime,
            )
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;

        let record = RevocationRecord::new(
            identity.subject.clone(),
            &refresh.token,
            metadata,
            refresh.claims.expires_at(),
        );
        self.store
            .insert(&record)
            .await
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;

        self.enforce_session_cap(&identity.subject, record.id).await;

        info!(
            subject = %identity.subject,
            record_id = %record.id,
            "Issued credential pair"
        );

        Ok(IssuedTokens {
            access_token: access.token,
            access_expires_in: access.claims.lifetime_seconds(),
            refresh_token: refresh.token,
            refresh_expires_at: record.expires_at,
            record_id: record.id,
        })
    }

    /// Revokes the oldest active records of `owner` beyond the session cap.
    async fn enforce_session_cap(&self, owner: &str, keep: Uuid) {
        let Some(max) = self.config.max_sessions_per_owner else {
            return;
        };

        let now = OffsetDateTime::now_utc();
        let mut active = match self.store.find_active_by_owner(owner, now).await {
            Ok(active) => active,
            Err(e) => {
                warn!(subject = %owner, error = %e, "Failed to load sessions for cap enforcement");
                return;
            }
        };
        if active.len() <= max {
            return;
        }

        active.retain(|r| r.id != keep);
        active.sort_by_key(|r| r.created_at);
        let excess = active.len() + 1 - max;

        for record in active.into_iter().take(excess) {
            match self.store.revoke(record.id, RevocationReason::Evicted, now).await {
                Ok(true) => info!(subject = %owner, record_id = %record.id, "Evicted oldest session"),
                Ok(false) => {}
                Err(e) => warn!(record_id = %record.id, error = %e, "Failed to evict session"),
            }
        }
    }

    /// Exchanges a presented refresh credential for a new access credential.
    ///
    /// # Errors
    ///
    /// - `Malformed`, `SignatureInvalid`, `Expired` if decoding fails
    /// - `Revoked` if the credential was revoked or already consumed by rotation
    /// - `NotFound` if no record matches
    /// - `StoreUnavailable` if the store fails
    pub async fn refresh(
        &self,
        presented: &str,
        metadata: OriginMetadata,
    ) -> AuthResult<RefreshedTokens> {
        // 1. Decode
        let claims = self.codec.decode(CredentialKind::Refresh, presented)?;
        let now = OffsetDateTime::now_utc();

        // 2. Load candidates and accept the first hash match
        let candidates = self.store.find_active_by_owner(&claims.sub, now).await?;
        let Some(record) = candidates.into_iter().find(|r| r.matches(presented)) else {
            return Err(self.reject_unmatched(presented, &claims, now).await);
        };

        // 3. Mint a new access credential
        let access = self
            .codec
            .issue(
                CredentialKind::Access,
                &claims.sub,
                &claims.role,
                self.config.access_token_lifetime,
            )
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;

        if !self.config.rotate_refresh_tokens {
            debug!(subject = %claims.sub, record_id = %record.id, "Refreshed access credential");
            return Ok(RefreshedTokens {
                access_token: access.token,
                access_expires_in: access.claims.lifetime_seconds(),
                refresh_token: None,
                refresh_expires_at: record.expires_at,
            });
        }

        // 4. Rotate: mint the replacement first, keeping the original expiry
        let remaining = record.expires_at - now;
        let replacement = self
            .codec
            .issue(CredentialKind::Refresh, &claims.sub, &claims.role, remaining)
            .map_err(|e| AuthError::issuance_failed(e.to_string()))?;

        let metadata = OriginMetadata {
            user_agent: metadata.user_agent.or(record.user_agent),
            origin: metadata.origin.or(record.origin),
        };
        let mut next = RevocationRecord::new(
            claims.sub.clone(),
            &replacement.token,
            metadata,
            record.expires_at,
        );
        next.created_at = now;

        // Persist the replacement before consuming the presented record.
        self.store.insert(&next).await?;

        let consumed = match self
            .store
            .revoke(record.id, RevocationReason::Rotated, now)
            .await
        {
            Ok(consumed) => consumed,
            Err(e) => {
                self.discard_replacement(&next, now).await;
                return Err(e);
            }
        };
        if !consumed {
            self.discard_replacement(&next, now).await;
            debug!(subject = %claims.sub, record_id = %record.id, "Lost rotation race");
            return Err(AuthError::revoked("credential already consumed"));
        }

        info!(
            subject = %claims.sub,
            record_id = %next.id,
            previous = %record.id,
            "Rotated refresh credential"
        );

        Ok(RefreshedTokens {
            access_token: access.token,
            access_expires_in: access.claims.lifetime_seconds(),
            refresh_token: Some(replacement.token),
            refresh_expires_at: next.expires_at,
        })
    }

    /// Revokes a replacement record whose credential was never handed out.
    async fn discard_replacement(&self, next: &RevocationRecord, now: OffsetDateTime) {
        if let Err(e) = self.store.revoke(next.id, RevocationReason::Rotated, now).await {
            warn!(record_id = %next.id, error = %e, "Failed to discard unused replacement record");
        }
    }

    /// Classifies a correctly signed credential that matched no active record.
    async fn reject_unmatched(
        &self,
        presented: &str,
        claims: &CredentialClaims,
        now: OffsetDateTime,
    ) -> AuthError {
        let hash = RevocationRecord::hash_credential(presented);
        let record = match self.store.find_by_hash(&hash).await {
            Ok(Some(record)) if record.owner == claims.sub => record,
            Ok(_) => return AuthError::NotFound,
            Err(e) => return e,
        };

        let Some(revoked_at) = record.revoked_at else {
            return AuthError::Expired;
        };

        if record.revocation_reason != Some(RevocationReason::Rotated) {
            return AuthError::revoked("credential revoked");
        }

        let within_grace = now - revoked_at <= self.config.reuse_grace;
        if within_grace || !self.config.reuse_detection {
            return AuthError::revoked("credential already consumed");
        }

        match self
            .store
            .revoke_all_for_owner(&claims.sub, RevocationReason::ReuseDetected, now)
            .await
        {
            Ok(count) => warn!(
                subject = %claims.sub,
                record_id = %record.id,
                revoked = count,
                "Rotated refresh credential replayed, revoked all sessions"
            ),
            Err(e) => warn!(subject = %claims.sub, error = %e, "Failed to revoke sessions after reuse"),
        }
        AuthError::revoked("refresh credential reuse detected")
    }

    /// Revokes the record matching a presented refresh credential.
    ///
    /// Returns `true` if a record was revoked by this call. A missing,
    /// unknown or already-revoked credential returns `false`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub async fn revoke(&self, presented: &str) -> AuthResult<bool> {
        let hash = RevocationRecord::hash_credential(presented);
        let Some(record) = self.store.find_by_hash(&hash).await? else {
            return Ok(false);
        };

        let revoked = self
            .store
            .revoke(record.id, RevocationReason::Logout, OffsetDateTime::now_utc())
            .await?;
        if revoked {
            info!(subject = %record.owner, record_id = %record.id, "Revoked refresh credential");
        }
        Ok(revoked)
    }

    /// Revokes every active session of an owner.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub async fn revoke_owner(&self, owner: &str) -> AuthResult<u64> {
        let count = self
            .store
            .revoke_all_for_owner(owner, RevocationReason::OwnerRevoked, OffsetDateTime::now_utc())
            .await?;
        info!(subject = %owner, revoked = count, "Revoked all sessions");
        Ok(count)
    }

    /// Verifies an access credential.
    ///
    /// # Errors
    ///
    /// Returns `Malformed`, `SignatureInvalid` or `Expired`.
    pub fn verify_access(&self, token: &str) -> AuthResult<CredentialClaims> {
        Ok(self.codec.decode(CredentialKind::Access, token)?)
    }

    /// Deletes expired records.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.store.cleanup_expired(OffsetDateTime::now_utc()).await
    }

    /// Returns the credential codec.
    #[must_use]
    pub fn codec(&self) -> &Arc<CredentialCodec> {
        &self.codec
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }
}
