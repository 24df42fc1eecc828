//! Access credential as held by the client.
//!
//! The client never verifies signatures; it only reads the `exp` claim to
//! decide when to refresh ahead of a server rejection.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::ClientError;

#[derive(Deserialize)]
struct UnverifiedClaims {
    exp: Option<i64>,
}

/// A bearer access credential and its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential {
    token: String,
    expires_at: Option<OffsetDateTime>,
}

impl AccessCredential {
    /// Creates a credential with a known expiry.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<OffsetDateTime>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Parses a bearer string, reading the unverified `exp` claim.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the string is not a three-part JWT with a JSON payload.
    pub fn from_token(token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into();
        let mut parts = token.split('.');
        let (Some(_), Some(payload), Some(_), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::malformed("access credential is not a JWT"));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| ClientError::malformed(format!("invalid payload encoding: {e}")))?;
        let claims: UnverifiedClaims = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::malformed(format!("invalid payload: {e}")))?;

        let expires_at = match claims.exp {
            Some(exp) => Some(
                OffsetDateTime::from_unix_timestamp(exp)
                    .map_err(|e| ClientError::malformed(format!("invalid exp claim: {e}")))?,
            ),
            None => None,
        };

        Ok(Self { token, expires_at })
    }

    /// Parses a bearer string from a token response, falling back to
    /// `expires_in` when the string carries no readable `exp`.
    #[must_use]
    pub fn from_response(token: impl Into<String>, expires_in: i64) -> Self {
        let token = token.into();
        match Self::from_token(token.clone()) {
            Ok(credential) if credential.expires_at.is_some() => credential,
            _ => Self {
                token,
                expires_at: Some(OffsetDateTime::now_utc() + time::Duration::seconds(expires_in)),
            },
        }
    }

    /// The bearer string.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    /// Returns `true` if the credential expires within `margin` from now.
    ///
    /// A credential without a known expiry is never considered expired
    /// locally; the server's 401 is the signal for those.
    #[must_use]
    pub fn is_expired(&self, margin: Duration) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc(), margin)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + margin >= expires_at)
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_from_token_reads_exp() {
        let token = jwt_with_payload(r#"{"sub":"user-1","exp":1900000000}"#);
        let credential = AccessCredential::from_token(token.clone()).unwrap();

        assert_eq!(credential.token(), token);
        assert_eq!(
            credential.expires_at().unwrap().unix_timestamp(),
            1_900_000_000
        );
    }

    #[test]
    fn test_from_token_rejects_garbage() {
        assert!(matches!(
            AccessCredential::from_token("not-a-jwt"),
            Err(ClientError::Malformed { .. })
        ));
        assert!(matches!(
            AccessCredential::from_token("a.!!!.c"),
            Err(ClientError::Malformed { .. })
        ));
        assert!(AccessCredential::from_token(jwt_with_payload("[1,2]")).is_err());
    }

    #[test]
    fn test_from_response_falls_back_to_expires_in() {
        let credential = AccessCredential::from_response("opaque-token", 900);
        let remaining = credential.expires_at().unwrap() - OffsetDateTime::now_utc();

        assert!(remaining > time::Duration::seconds(890));
        assert!(remaining <= time::Duration::seconds(900));
    }

    #[test]
    fn test_expiry_margin() {
        let now = OffsetDateTime::now_utc();
        let credential = AccessCredential::new("t", Some(now + time::Duration::seconds(3)));

        assert!(!credential.is_expired_at(now, Duration::ZERO));
        assert!(credential.is_expired_at(now, Duration::from_secs(5)));
        assert!(!AccessCredential::new("t", None).is_expired_at(now, Duration::from_secs(60)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = AccessCredential::new("secret-bearer", None);
        assert!(!format!("{credential:?}").contains("secret-bearer"));
    }
}
