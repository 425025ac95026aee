//! Usage log repository port.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{NewUsageLog, UsageLogEntry};

/// Append-only store for usage rows.
///
/// Implementations must be safe to share across concurrent requests; the
/// bridge holds a single `Arc<dyn UsageLogRepository>` for its lifetime.
#[async_trait]
pub trait UsageLogRepository: Send + Sync {
    /// Append one row and return its id. `created_at` is assigned by the store.
    async fn record(&self, entry: NewUsageLog) -> Result<i64, RepositoryError>;

    /// Most recent rows, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError>;

    /// Total number of stored rows.
    async fn count(&self) -> Result<i64, RepositoryError>;
}
