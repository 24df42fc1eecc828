//! Credential codec.
//!
//! Encodes and decodes the signed, time-bounded claims carried by access and
//! refresh credentials. Both classes are HS256 JWTs, but each class is signed
//! with its own secret so that a leaked access key cannot mint refresh
//! credentials (and vice versa).
//!
//! ## Example
//!
//! ```ignore
//! use tollgate_auth::token::jwt::{CredentialCodec, CredentialKind};
//!
//! let codec = CredentialCodec::new(access_secret, refresh_secret, "https://auth.example.com")?;
//! let issued = codec.issue(CredentialKind::Access, "user-1", "editor", time::Duration::minutes(15))?;
//! let claims = codec.decode(CredentialKind::Access, &issued.token)?;
//! ```

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Minimum accepted length of an HMAC signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while encoding or decoding credentials.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// The bearer string could not be parsed.
    #[error("Malformed credential: {message}")]
    Malformed {
        /// Description of the parse error.
        message: String,
    },

    /// The signature check (or issuer check) failed.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The encoded expiry has passed.
    #[error("Credential expired")]
    Expired,

    /// Failed to encode a credential.
    #[error("Failed to encode credential: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// A signing key is unusable.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl CodecError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` for errors produced while decoding a presented credential.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::SignatureInvalid | Self::Expired
        )
    }
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            // A foreign issuer is treated like a foreign key: we did not sign it.
            ErrorKind::InvalidSignature | ErrorKind::InvalidIssuer => Self::SignatureInvalid,
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Credential Kind
// ============================================================================

/// The two credential classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Short-lived credential authorizing individual API calls.
    Access,
    /// Long-lived credential exchanged only for fresh access credentials.
    Refresh,
}

impl CredentialKind {
    /// Returns the value stored in the `typ` claim.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by both credential classes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (owning identity id).
    pub sub: String,

    /// Role granted to the subject.
    pub role: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Unique credential id.
    pub jti: String,

    /// Credential class.
    pub typ: CredentialKind,
}

impl CredentialClaims {
    /// Returns the expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Returns the configured lifetime (`exp - iat`) in seconds.
    #[must_use]
    pub fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}

/// A freshly minted credential and the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// The signed bearer string.
    pub token: String,
    /// The claims that were signed.
    pub claims: CredentialClaims,
}

// ============================================================================
// Signing Key
// ============================================================================

/// HMAC key material for one credential class.
struct SigningKey {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    fn from_secret(kind: CredentialKind, secret: &[u8]) -> Result<Self, CodecError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(CodecError::invalid_key(format!(
                "{kind} secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.len()
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }
}

// ============================================================================
// Credential Codec
// ============================================================================

/// Encodes and verifies access and refresh credentials.
///
/// The codec is `Send + Sync` and stateless; decoding never mutates anything.
pub struct CredentialCodec {
    access_key: SigningKey,
    refresh_key: SigningKey,
    issuer: String,
    leeway_seconds: u64,
}

impl CredentialCodec {
    /// Creates a codec from the two class secrets.
    ///
    /// # Errors
    /// Returns an error if either secret is too short or both are identical.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        issuer: impl Into<String>,
    ) -> Result<Self, CodecError> {
        if access_secret == refresh_secret {
            return Err(CodecError::invalid_key(
                "access and refresh secrets must differ",
            ));
        }

        Ok(Self {
            access_key: SigningKey::from_secret(CredentialKind::Access, access_secret)?,
            refresh_key: SigningKey::from_secret(CredentialKind::Refresh, refresh_secret)?,
            issuer: issuer.into(),
            leeway_seconds: 0,
        })
    }

    /// Sets the clock-skew tolerance applied to expiry checks.
    #[must_use]
    pub fn with_leeway(mut self, leeway: std::time::Duration) -> Self {
        self.leeway_seconds = leeway.as_secs();
        self
    }

    /// Returns the issuer claim value.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    fn key(&self, kind: CredentialKind) -> &SigningKey {
        match kind {
            CredentialKind::Access => &self.access_key,
            CredentialKind::Refresh => &self.refresh_key,
        }
    }

    /// Mints a signed credential of the given class.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue(
        &self,
        kind: CredentialKind,
        subject: impl Into<String>,
        role: impl Into<String>,
        ttl: Duration,
    ) -> Result<IssuedCredential, CodecError> {
        let now = OffsetDateTime::now_utc();
        let claims = CredentialClaims {
            iss: self.issuer.clone(),
            sub: subject.into(),
            role: role.into(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            typ: kind,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.key(kind).encoding_key,
        )
        .map_err(|e| CodecError::encoding(e.to_string()))?;

        Ok(IssuedCredential { token, claims })
    }

    /// Verifies a bearer string of the given class and returns its claims.
    ///
    /// # Errors
    /// Returns `Malformed`, `SignatureInvalid` or `Expired`.
    pub fn decode(&self, kind: CredentialKind, token: &str) -> Result<CredentialClaims, CodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = self.leeway_seconds;

        let claims = decode::<CredentialClaims>(token, &self.key(kind).decoding_key, &validation)?
            .claims;

        if claims.typ != kind {
            return Err(CodecError::malformed(format!(
                "expected {kind} credential, got {}",
                claims.typ
            )));
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &[u8] = b"access-secret-access-secret-0123456789";
    const REFRESH_SECRET: &[u8] = b"refresh-secret-refresh-secret-012345678";

    fn codec() -> CredentialCodec {
        CredentialCodec::new(ACCESS_SECRET, REFRESH_SECRET, "https://auth.example.com").unwrap()
    }

    #[test]
    fn test_access_encode_decode() {
        let codec = codec();
        let issued = codec
            .issue(CredentialKind::Access, "user-1", "editor", Duration::minutes(15))
            .unwrap();

        let claims = codec.decode(CredentialKind::Access, &issued.token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, "editor");
        assert_eq!(claims.iss, "https://auth.example.com");
        assert_eq!(claims.typ, CredentialKind::Access);
        assert_eq!(claims.lifetime_seconds(), 900);
    }

    #[test]
    fn test_refresh_encode_decode() {
        let codec = codec();
        let issued = codec
            .issue(CredentialKind::Refresh, "user-1", "editor", Duration::days(30))
            .unwrap();

        let claims = codec.decode(CredentialKind::Refresh, &issued.token).unwrap();
        assert_eq!(claims.typ, CredentialKind::Refresh);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_each_issue_is_unique() {
        let codec = codec();
        let a = codec
            .issue(CredentialKind::Access, "user-1", "editor", Duration::minutes(15))
            .unwrap();
        let b = codec
            .issue(CredentialKind::Access, "user-1", "editor", Duration::minutes(15))
            .unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn test_access_key_cannot_verify_refresh_credential() {
        let codec = codec();
        let refresh = codec
            .issue(CredentialKind::Refresh, "user-1", "editor", Duration::days(1))
            .unwrap();

        let result = codec.decode(CredentialKind::Access, &refresh.token);
        assert!(matches!(result, Err(CodecError::SignatureInvalid)));
    }

    #[test]
    fn test_expired_credential_rejected() {
        let codec = codec();
        let issued = codec
            .issue(CredentialKind::Access, "user-1", "editor", Duration::seconds(-3600))
            .unwrap();

        let result = codec.decode(CredentialKind::Access, &issued.token);
        assert!(matches!(result, Err(CodecError::Expired)));
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let codec = codec().with_leeway(std::time::Duration::from_secs(120));
        let issued = codec
            .issue(CredentialKind::Access, "user-1", "editor", Duration::seconds(-30))
            .unwrap();

        assert!(codec.decode(CredentialKind::Access, &issued.token).is_ok());
    }

    #[test]
    fn test_foreign_key_rejected() {
        let other = CredentialCodec::new(
            b"another-access-secret-0123456789abcdef",
            REFRESH_SECRET,
            "https://auth.example.com",
        )
        .unwrap();
        let issued = other
            .issue(CredentialKind::Access, "user-1", "editor", Duration::minutes(5))
            .unwrap();

        let result = codec().decode(CredentialKind::Access, &issued.token);
        assert!(matches!(result, Err(CodecError::SignatureInvalid)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let other =
            CredentialCodec::new(ACCESS_SECRET, REFRESH_SECRET, "https://evil.example.com").unwrap();
        let issued = other
            .issue(CredentialKind::Access, "user-1", "editor", Duration::minutes(5))
            .unwrap();

        let result = codec().decode(CredentialKind::Access, &issued.token);
        assert!(matches!(result, Err(CodecError::SignatureInvalid)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();
        assert!(matches!(
            codec.decode(CredentialKind::Access, "not-a-jwt"),
            Err(CodecError::Malformed { .. })
        ));
        assert!(matches!(
            codec.decode(CredentialKind::Access, ""),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let issued = codec
            .issue(CredentialKind::Access, "user-1", "viewer", Duration::minutes(5))
            .unwrap();

        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let forged = codec
            .issue(CredentialKind::Access, "user-1", "admin", Duration::minutes(5))
            .unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");

        let result = codec.decode(CredentialKind::Access, &tampered);
        assert!(matches!(result, Err(CodecError::SignatureInvalid)));
    }

    #[test]
    fn test_secret_validation() {
        assert!(matches!(
            CredentialCodec::new(b"short", REFRESH_SECRET, "iss"),
            Err(CodecError::InvalidKey { .. })
        ));
        assert!(matches!(
            CredentialCodec::new(ACCESS_SECRET, ACCESS_SECRET, "iss"),
            Err(CodecError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&CredentialKind::Refresh).unwrap(),
            "\"refresh\""
        );
        assert_eq!(CredentialKind::Access.to_string(), "access");
    }
}
