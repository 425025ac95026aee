//! Row mapping helpers shared by both backends.

use chrono::NaiveDateTime;
use mbridge_core::{RepositoryError, RequestType, UsageLogEntry};

/// Shared SELECT column list for usage queries.
pub const USAGE_SELECT_COLUMNS: &str =
    "id, user_id, request_type, prompt, tokens_in, tokens_out, duration_ms, created_at";

/// Parse `SQLite` `datetime('now')` output (optionally with fractional seconds).
pub fn parse_datetime(datetime_str: &str) -> Result<NaiveDateTime, RepositoryError> {
    let trimmed = datetime_str.trim_end_matches(" UTC");
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| RepositoryError::Serialization(format!("created_at '{datetime_str}': {e}")))
}

/// Clamp a count into the INTEGER column range.
pub fn to_column(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Raw column values, before domain conversion.
pub struct RawUsageRow {
    pub id: i64,
    pub user_id: String,
    pub request_type: String,
    pub prompt: String,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub duration_ms: i64,
    pub created_at: NaiveDateTime,
}

impl TryFrom<RawUsageRow> for UsageLogEntry {
    type Error = RepositoryError;

    fn try_from(raw: RawUsageRow) -> Result<Self, Self::Error> {
        let request_type = RequestType::parse(&raw.request_type).ok_or_else(|| {
            RepositoryError::Serialization(format!("unknown request_type '{}'", raw.request_type))
        })?;

        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            request_type,
            prompt: raw.prompt,
            tokens_in: u32::try_from(raw.tokens_in).unwrap_or(0),
            tokens_out: u32::try_from(raw.tokens_out).unwrap_or(0),
            duration_ms: u64::try_from(raw.duration_ms).unwrap_or(0),
            created_at: raw.created_at,
        })
    }
}
