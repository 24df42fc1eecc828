//! Authentication context types.

use time::OffsetDateTime;

use crate::token::jwt::CredentialClaims;

/// Authenticated request context extracted by [`super::BearerAuth`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthContext {
    /// Owning identity id.
    pub subject: String,

    /// Role granted to the subject.
    pub role: String,

    /// Issuer of the access credential.
    pub issuer: String,

    /// When the access credential expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Credential id.
    pub jti: String,
}

impl AuthContext {
    /// Returns `true` if the subject holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

impl From<CredentialClaims> for AuthContext {
    fn from(claims: CredentialClaims) -> Self {
        Self {
            expires_at: claims.expires_at(),
            subject: claims.sub,
            role: claims.role,
            issuer: claims.iss,
            jti: claims.jti,
        }
    }
}
