//! Error response handling.
//!
//! Renders `AuthError` as `{ "error": <code>, "error_description": <message> }`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let code = self.error_code();

        let description = match &self {
            AuthError::Internal { .. } | AuthError::Configuration { .. } => {
                tracing::error!(error = %self, "Internal auth error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(code, &description);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        let body = json!({
            "error": code,
            "error_description": description,
        });

        (status, headers, Json(body)).into_response()
    }
}

/// Maps an error to its HTTP status.
#[must_use]
pub fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::MissingCredential { .. } => StatusCode::BAD_REQUEST,
        AuthError::Malformed { .. }
        | AuthError::SignatureInvalid
        | AuthError::Expired
        | AuthError::Revoked { .. }
        | AuthError::NotFound
        | AuthError::Unauthenticated { .. }
        | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::IssuanceFailed { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Format: `Bearer realm="tollgate", error="expired", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!("Bearer realm=\"tollgate\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}

// =============================================================================
// Tests
// =============================================================================
