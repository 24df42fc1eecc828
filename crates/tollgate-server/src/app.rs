//! Router and state assembly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::FromRef;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use tollgate_auth::{
    AuthContext, AuthState, BearerAuth, InMemoryRevocationStore, RevocationStore,
    StaticIdentityVerifier, TokenService, auth_router,
};
use tollgate_auth_postgres::PostgresRevocationStore;

use crate::config::{AppConfig, StorageBackend};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Opens the configured revocation store.
pub async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RevocationStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory revocation store; sessions do not survive restarts");
            Ok(Arc::new(InMemoryRevocationStore::new()))
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .postgres_url
                .as_deref()
                .context("storage.postgres_url is not set")?;
            let store = PostgresRevocationStore::connect(url)
                .await
                .context("connecting to postgres")?;
            store
                .ensure_schema()
                .await
                .context("creating revocation schema")?;
            tracing::info!("Using postgres revocation store");
            Ok(Arc::new(store))
        }
    }
}

/// Builds the shared state from configuration.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store = build_store(config).await?;
    let tokens = Arc::new(TokenService::from_config(&config.auth, store)?);
    let verifier = Arc::new(StaticIdentityVerifier::new(config.users.iter().cloned())?);
    if verifier.is_empty() {
        tracing::warn!("No users configured; every login will be rejected");
    }

    Ok(AppState {
        auth: AuthState::new(tokens, verifier, config.auth.cookies.clone()),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/me", get(me))
        .merge(auth_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds state and router in one step.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<(Router, AppState)> {
    let state = build_state(config).await?;
    Ok((router(state.clone()), state))
}

/// Deletes expired revocation records every `every`.
pub fn start_cleanup_task(tokens: Arc<TokenService>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;

            match tokens.cleanup_expired().await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "Deleted expired revocation records");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Revocation record cleanup failed");
                }
                _ => {}
            }
        }
    })
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn me(BearerAuth(context): BearerAuth) -> Json<AuthContext> {
    Json(context)
}
