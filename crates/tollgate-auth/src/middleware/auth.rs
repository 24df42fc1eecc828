//! Bearer credential authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use tollgate_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.subject)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::config::CookieConfig;
use crate::error::AuthError;
use crate::http::cookies;
use crate::identity::IdentityVerifier;
use crate::token::TokenService;

use super::types::AuthContext;

// =============================================================================
// Auth State
// =============================================================================

/// State shared by the auth endpoints and the [`BearerAuth`] extractor.
///
/// Include it in your application state and expose it via `FromRef`:
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    /// Issues, refreshes and revokes credentials.
    pub tokens: Arc<TokenService>,

    /// Verifies login credentials.
    pub verifier: Arc<dyn IdentityVerifier>,

    /// Cookie names and attributes.
    pub cookies: Arc<CookieConfig>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(
        tokens: Arc<TokenService>,
        verifier: Arc<dyn IdentityVerifier>,
        cookies: CookieConfig,
    ) -> Self {
        Self {
            tokens,
            verifier,
            cookies: Arc::new(cookies),
        }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates the access credential.
///
/// The credential is taken from `Authorization: Bearer <token>` first, then
/// from the access cookie names in priority order.
///
/// # Errors
///
/// Rejects with `Unauthenticated` when no credential is present and with
/// `Malformed`, `SignatureInvalid` or `Expired` when it does not verify.
/// All of these render as `401`.
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = match extract_bearer(parts) {
            Some(token) => token,
            None => {
                let jar = CookieJar::from_headers(&parts.headers);
                cookies::read_first(&jar, &auth_state.cookies.access_read_names())
                    .ok_or_else(|| AuthError::unauthenticated("missing access credential"))?
            }
        };

        let claims = auth_state.tokens.verify_access(&token).map_err(|e| {
            tracing::debug!(error = %e, "Access credential rejected");
            e
        })?;

        tracing::debug!(subject = %claims.sub, jti = %claims.jti, "Access credential validated");

        Ok(BearerAuth(AuthContext::from(claims)))
    }
}

fn extract_bearer(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::get,
    };
    use tower::ServiceExt;

    use crate::identity::{StaticIdentityVerifier, VerifiedIdentity};
    use crate::storage::InMemoryRevocationStore;
    use crate::token::{CredentialCodec, CredentialKind, TokenConfig};
    use crate::types::OriginMetadata;

    fn state() -> AuthState {
        let codec = CredentialCodec::new(
            b"access-secret-access-secret-0123456789",
            b"refresh-secret-refresh-secret-012345678",
            "https://auth.example.com",
        )
        .unwrap();
        let tokens = TokenService::new(
            Arc::new(codec),
            Arc::new(InMemoryRevocationStore::new()),
            TokenConfig::default(),
        );
        AuthState::new(
            Arc::new(tokens),
            Arc::new(StaticIdentityVerifier::default()),
            CookieConfig {
                secure: false,
                ..CookieConfig::default()
            },
        )
    }

    async fn whoami(BearerAuth(auth): BearerAuth) -> String {
        auth.subject
    }

    fn app(state: AuthState) -> Router {
        Router::new().route("/me", get(whoami)).with_state(state)
    }

    async fn access_token(state: &AuthState) -> String {
        state
            .tokens
            .issue(&VerifiedIdentity::new("user-1", "editor"), OriginMetadata::default())
            .await
            .unwrap()
            .access_token
    }

    #[tokio::test]
    async fn test_bearer_header_accepted() {
        let state = state();
        let token = access_token(&state).await;

        let response = app(state)
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_access_cookie_accepted() {
        let state = state();
        let token = access_token(&state).await;

        let response = app(state)
            .oneshot(
                Request::get("/me")
                    .header(header::COOKIE, format!("tollgate_access={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_credential_is_401() {
        let response = app(state())
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_expired_credential_is_401() {
        let state = state();
        let expired = state
            .tokens
            .codec()
            .issue(CredentialKind::Access, "user-1", "editor", time::Duration::seconds(-60))
            .unwrap();

        let response = app(state)
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", expired.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_credential_not_accepted_as_access() {
        let state = state();
        let refresh = state
            .tokens
            .issue(&VerifiedIdentity::new("user-1", "editor"), OriginMetadata::default())
            .await
            .unwrap()
            .refresh_token;

        let response = app(state)
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
