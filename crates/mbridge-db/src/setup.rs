//! Database schema setup.
//!
//! Both backends store usage rows in a single `mistral_logs` table indexed
//! by `user_id`. Every statement uses IF NOT EXISTS, so setup is safe to
//! run on every start.

use mbridge_core::RepositoryError;
use sqlx::{PgPool, SqlitePool};

/// Creates the usage table and its index on PostgreSQL.
pub async fn ensure_postgres_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mistral_logs (
            id SERIAL PRIMARY KEY,
            user_id VARCHAR(255) NOT NULL,
            request_type VARCHAR(50) NOT NULL,
            prompt TEXT NOT NULL,
            tokens_in INTEGER NOT NULL DEFAULT 0,
            tokens_out INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| RepositoryError::Storage(e.to_string()))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mistral_logs_user_id ON mistral_logs(user_id)")
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

    Ok(())
}

/// Creates the usage table and its index on `SQLite`.
pub async fn ensure_sqlite_schema(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mistral_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id VARCHAR(255) NOT NULL,
            request_type VARCHAR(50) NOT NULL,
            prompt TEXT NOT NULL,
            tokens_in INTEGER NOT NULL DEFAULT 0,
            tokens_out INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| RepositoryError::Storage(e.to_string()))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mistral_logs_user_id ON mistral_logs(user_id)")
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

    Ok(())
}

/// Sets up an in-memory `SQLite` database for testing.
///
/// The pool is pinned to one connection: every `sqlite::memory:`
/// connection would otherwise open its own empty database.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool, RepositoryError> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
    ensure_sqlite_schema(&pool).await?;
    Ok(pool)
}
