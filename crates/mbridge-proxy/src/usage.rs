//! Detached usage logging.
//!
//! A write is spawned onto the runtime once the upstream result is known.
//! The response never waits for it, and a failed write is only logged.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mbridge_core::{NewUsageLog, UsageLogRepository};

/// Handle to the optional metrics store.
///
/// Cloned into every request; `None` means logging is disabled.
#[derive(Clone, Default)]
pub struct UsageRecorder {
    store: Option<Arc<dyn UsageLogRepository>>,
}

impl UsageRecorder {
    /// Recorder writing to `store`.
    pub fn new(store: Arc<dyn UsageLogRepository>) -> Self {
        Self { store: Some(store) }
    }

    /// Recorder that drops every entry.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn from_option(store: Option<Arc<dyn UsageLogRepository>>) -> Self {
        Self { store }
    }

    pub const fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Spawn one write for `entry` and return immediately.
    ///
    /// Returns the task handle so callers (mostly tests) can wait for the
    /// write; dropping it does not cancel the task.
    pub fn record_detached(&self, entry: NewUsageLog) -> Option<JoinHandle<()>> {
        let store = Arc::clone(self.store.as_ref()?);

        Some(tokio::spawn(async move {
            let user_id = entry.user_id.clone();
            let request_type = entry.request_type;
            match store.record(entry).await {
                Ok(id) => debug!(id, %user_id, %request_type, "Usage row recorded"),
                Err(e) => warn!(error = %e, %user_id, %request_type, "Failed to save usage row"),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mbridge_core::{RepositoryError, RequestType, TokenUsage, UsageLogEntry};

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<NewUsageLog>>,
    }

    #[async_trait]
    impl UsageLogRepository for MemoryStore {
        async fn record(&self, entry: NewUsageLog) -> Result<i64, RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            rows.push(entry);
            Ok(i64::try_from(rows.len()).unwrap())
        }

        async fn recent(&self, _limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<i64, RepositoryError> {
            Ok(i64::try_from(self.rows.lock().unwrap().len()).unwrap())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl UsageLogRepository for BrokenStore {
        async fn record(&self, _entry: NewUsageLog) -> Result<i64, RepositoryError> {
            Err(RepositoryError::Storage("relation \"mistral_logs\" does not exist".into()))
        }

        async fn recent(&self, _limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<i64, RepositoryError> {
            Ok(0)
        }
    }

    fn entry() -> NewUsageLog {
        NewUsageLog::new("alice", RequestType::Chat, "[]", TokenUsage::default(), 5)
    }

    #[tokio::test]
    async fn test_disabled_recorder_spawns_nothing() {
        let recorder = UsageRecorder::disabled();
        assert!(!recorder.is_enabled());
        assert!(recorder.record_detached(entry()).is_none());
    }

    #[tokio::test]
    async fn test_enabled_recorder_writes_once() {
        let store = Arc::new(MemoryStore::default());
        let recorder = UsageRecorder::new(store.clone());

        recorder.record_detached(entry()).unwrap().await.unwrap();
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_panic_the_task() {
        let recorder = UsageRecorder::new(Arc::new(BrokenStore));
        let handle = recorder.record_detached(entry()).unwrap();
        assert!(handle.await.is_ok());
    }
}
