//! Logs command handler.
//!
//! Reads back the most recent usage rows from the metrics store.

use mbridge_core::{BridgeConfig, UsageLogEntry};
use mbridge_db::StoreFactory;

use crate::error::CliError;

/// Longest prompt excerpt shown in the table.
const PROMPT_PREVIEW_CHARS: usize = 48;

/// Execute the logs command.
pub async fn execute(config: &BridgeConfig, limit: u32, json: bool) -> Result<(), CliError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| CliError::Config("DATABASE_URL is not set".to_string()))?;

    let store = StoreFactory::connect(url).await?;
    let total = store.count().await?;
    let rows = store.recent(limit).await?;

    if json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError::Io(format!("failed to encode rows: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("No usage rows recorded.");
        return Ok(());
    }

    println!(
        "{:<6} {:<19} {:<16} {:<10} {:>7} {:>7} {:>8}  PROMPT",
        "ID", "CREATED", "USER", "TYPE", "IN", "OUT", "MS"
    );
    for row in &rows {
        println!("{}", format_row(row));
    }
    println!("\nShowing {} of {total} rows.", rows.len());
    Ok(())
}

/// One table line for `entry`.
fn format_row(entry: &UsageLogEntry) -> String {
    format!(
        "{:<6} {:<19} {:<16} {:<10} {:>7} {:>7} {:>8}  {}",
        entry.id,
        entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        entry.user_id,
        entry.request_type,
        entry.tokens_in,
        entry.tokens_out,
        entry.duration_ms,
        preview(&entry.prompt)
    )
}

/// Single-line prompt excerpt.
fn preview(prompt: &str) -> String {
    let flat: String = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PROMPT_PREVIEW_CHARS {
        let cut: String = flat.chars().take(PROMPT_PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mbridge_core::{NewUsageLog, RequestType, TokenUsage};

    fn entry(prompt: &str) -> UsageLogEntry {
        UsageLogEntry {
            id: 7,
            user_id: "u1".to_string(),
            request_type: RequestType::Chat,
            prompt: prompt.to_string(),
            tokens_in: 3,
            tokens_out: 2,
            duration_ms: 812,
            created_at: NaiveDate::from_ymd_opt(2025, 5, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_format_row() {
        let line = format_row(&entry("hello\n  world"));
        assert!(line.starts_with("7 "));
        assert!(line.contains("2025-05-15 10:30:00"));
        assert!(line.contains("chat"));
        assert!(line.ends_with("hello world"));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PROMPT_PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
    }

    #[tokio::test]
    async fn test_logs_requires_database_url() {
        let err = execute(&BridgeConfig::default(), 10, false)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[tokio::test]
    async fn test_logs_reads_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("usage.db").display());

        let store = StoreFactory::connect(&url).await.unwrap();
        store
            .record(NewUsageLog::new(
                "u1",
                RequestType::Completion,
                "hello",
                TokenUsage {
                    prompt_tokens: 1,
                    completion_tokens: 1,
                },
                40,
            ))
            .await
            .unwrap();

        let config = BridgeConfig::default().with_database_url(Some(url));
        assert!(execute(&config, 5, false).await.is_ok());
        assert!(execute(&config, 5, true).await.is_ok());
    }
}
