//! Identity verification for the login endpoint.
//!
//! Credential issuance only needs a verified `(subject, role)` pair. The
//! [`IdentityVerifier`] trait is the seam where a real user directory plugs
//! in; [`StaticIdentityVerifier`] checks Argon2id PHC hashes from config.

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;

/// An authenticated identity, ready for credential issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Owning identity id, written to the `sub` claim.
    pub subject: String,
    /// Role written to the `role` claim.
    pub role: String,
}

impl VerifiedIdentity {
    /// Creates a new verified identity.
    #[must_use]
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// Verifies login credentials.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the identity for a valid username/password pair, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error only if the verifier itself fails.
    async fn verify(&self, username: &str, password: &str) -> AuthResult<Option<VerifiedIdentity>>;
}

/// A user entry for [`StaticIdentityVerifier`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticUser {
    /// Login name.
    pub username: String,
    /// Argon2 PHC string, e.g. `$argon2id$v=19$...`.
    pub password_hash: String,
    /// Subject id. Defaults to the username.
    #[serde(default)]
    pub subject: Option<String>,
    /// Role claim.
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

/// Verifies logins against a fixed set of users.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityVerifier {
    users: HashMap<String, StaticUser>,
}

impl StaticIdentityVerifier {
    /// Creates a verifier from user entries.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a password hash is not a valid PHC string.
    pub fn new(users: impl IntoIterator<Item = StaticUser>) -> AuthResult<Self> {
        let mut map = HashMap::new();
        for user in users {
            PasswordHash::new(&user.password_hash).map_err(|e| {
                AuthError::configuration(format!(
                    "invalid password hash for user '{}': {e}",
                    user.username
                ))
            })?;
            map.insert(user.username.clone(), user);
        }
        Ok(Self { users: map })
    }

    /// Number of configured users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, username: &str, password: &str) -> AuthResult<Option<VerifiedIdentity>> {
        let Some(user) = self.users.get(username).cloned() else {
            return Ok(None);
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        // Argon2 is CPU-bound; keep it off the async workers.
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("password verification failed: {e}")))?;

        if !valid {
            return Ok(None);
        }

        let subject = user.subject.unwrap_or(user.username);
        Ok(Some(VerifiedIdentity::new(subject, user.role)))
    }
}

/// Hash a password for secure storage using Argon2id.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only if the hash is malformed.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if the hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, password: &str, subject: Option<&str>) -> StaticUser {
        StaticUser {
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            subject: subject.map(str::to_string),
            role: "editor".to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_rejected_at_construction() {
        let bad = StaticUser {
            username: "alice".to_string(),
            password_hash: "plaintext".to_string(),
            subject: None,
            role: "user".to_string(),
        };
        assert!(matches!(
            StaticIdentityVerifier::new([bad]),
            Err(AuthError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_valid_login() {
        let verifier =
            StaticIdentityVerifier::new([user("alice", "wonderland", Some("user-42"))]).unwrap();

        let identity = verifier.verify("alice", "wonderland").await.unwrap().unwrap();
        assert_eq!(identity, VerifiedIdentity::new("user-42", "editor"));
    }

    #[tokio::test]
    async fn test_subject_defaults_to_username() {
        let verifier = StaticIdentityVerifier::new([user("bob", "builder", None)]).unwrap();
        let identity = verifier.verify("bob", "builder").await.unwrap().unwrap();
        assert_eq!(identity.subject, "bob");
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_password_and_unknown_user() {
        let verifier = StaticIdentityVerifier::new([user("alice", "wonderland", None)]).unwrap();

        assert!(verifier.verify("alice", "nope").await.unwrap().is_none());
        assert!(verifier.verify("mallory", "wonderland").await.unwrap().is_none());
    }
}
