//! `SQLite` implementation of the `UsageLogRepository` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use mbridge_core::{NewUsageLog, RepositoryError, UsageLogEntry, UsageLogRepository};

use super::row_mappers::{RawUsageRow, USAGE_SELECT_COLUMNS, parse_datetime, to_column};

/// `SQLite` implementation of the `UsageLogRepository` trait.
///
/// Used for single-host deployments and as the test backend.
pub struct SqliteUsageLogRepository {
    pool: SqlitePool,
}

impl SqliteUsageLogRepository {
    /// Create a new `SQLite` usage log repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<UsageLogEntry, RepositoryError> {
    let get_int = |column: &str| {
        row.try_get::<i64, _>(column)
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    };

    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

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
        created_at: parse_datetime(&created_at)?,
    };

    UsageLogEntry::try_from(raw)
}

#[async_trait]
impl UsageLogRepository for SqliteUsageLogRepository {
    async fn record(&self, entry: NewUsageLog) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO mistral_logs (user_id, request_type, prompt, tokens_in, tokens_out, duration_ms) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.user_id)
        .bind(entry.request_type.as_str())
        .bind(&entry.prompt)
        .bind(to_column(u64::from(entry.tokens_in)))
        .bind(to_column(u64::from(entry.tokens_out)))
        .bind(to_column(entry.duration_ms))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USAGE_SELECT_COLUMNS} FROM mistral_logs ORDER BY id DESC LIMIT ?"
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
