//! PostgreSQL implementation of the `UsageLogRepository` trait.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use mbridge_core::{NewUsageLog, RepositoryError, UsageLogEntry, UsageLogRepository};

use super::row_mappers::{RawUsageRow, USAGE_SELECT_COLUMNS, to_column};

/// PostgreSQL implementation of the `UsageLogRepository` trait.
///
/// `created_at` is assigned by the server with `NOW()`.
pub struct PostgresUsageLogRepository {
    pool: PgPool,
}

impl PostgresUsageLogRepository {
    /// Create a new PostgreSQL usage log repository.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &PgRow) -> Result<UsageLogEntry, RepositoryError> {
    let get_int = |column: &str| {
        row.try_get::<i32, _>(column)
            .map(i64::from)
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    };

    let raw = RawUsageRow {
        id: get_int("id")?,
        user_id: row
            .try_get("user_id")
            .map_err(|e| RepositoryError::Storage(e.to_string()))?,
        request_type: row
            .try_get("request_type")
            .map_err(|e| RepositoryError::Storage(e.to_string()))?,
        prompt: row
            .try_get("prompt")
            .map_err(|e| RepositoryError::Storage(e.to_string()))?,
        tokens_in: get_int("tokens_in")?,
        tokens_out: get_int("tokens_out")?,
        duration_ms: get_int("duration_ms")?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| RepositoryError::Storage(e.to_string()))?,
    };

    UsageLogEntry::try_from(raw)
}

#[async_trait]
impl UsageLogRepository for PostgresUsageLogRepository {
    async fn record(&self, entry: NewUsageLog) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO mistral_logs (user_id, request_type, prompt, tokens_in, tokens_out, duration_ms, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING id",
        )
        .bind(&entry.user_id)
        .bind(entry.request_type.as_str())
        .bind(&entry.prompt)
        .bind(to_column(u64::from(entry.tokens_in)))
        .bind(to_column(u64::from(entry.tokens_out)))
        .bind(to_column(entry.duration_ms))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.try_get::<i32, _>("id")
            .map(i64::from)
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    }

    async fn recent(&self, limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USAGE_SELECT_COLUMNS} FROM mistral_logs ORDER BY id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mistral_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(count)
    }
}
