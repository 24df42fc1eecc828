//! Schema bootstrap for the revocation table.

use sqlx_core::query::query;

use crate::{PgPool, StorageResult};

/// Statements run by [`ensure_schema`], in order. Each is idempotent.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS revocation_record (
        id UUID PRIMARY KEY,
        owner TEXT NOT NULL,
        credential_hash TEXT NOT NULL UNIQUE,
        user_agent TEXT,
        origin TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        revoked_at TIMESTAMPTZ,
        revocation_reason TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS revocation_record_owner_active_idx
        ON revocation_record (owner, expires_at)
        WHERE revoked_at IS NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS revocation_record_expires_at_idx
        ON revocation_record (expires_at)
    "#,
];

/// Creates the revocation table and its indexes if they do not exist.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn ensure_schema(pool: &PgPool) -> StorageResult<()> {
    for statement in SCHEMA_STATEMENTS {
        query(*statement).execute(pool).await?;
    }
    tracing::debug!("Revocation schema ensured");
    Ok(())
}
