//! Shared helpers for mbridge-proxy integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use mbridge_core::{
    BridgeConfig, NewUsageLog, RepositoryError, UsageLogEntry, UsageLogRepository,
};
use mbridge_proxy::{BridgeState, create_router};

/// Upstream address nothing listens on.
pub const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:1";

/// How long a test waits for a detached usage write.
pub const WRITE_WAIT: Duration = Duration::from_secs(2);

/// Store that forwards every recorded row to a channel.
pub struct ChannelStore {
    tx: mpsc::UnboundedSender<NewUsageLog>,
}

impl ChannelStore {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<NewUsageLog>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl UsageLogRepository for ChannelStore {
    async fn record(&self, entry: NewUsageLog) -> Result<i64, RepositoryError> {
        self.tx
            .send(entry)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(1)
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(0)
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl UsageLogRepository for FailingStore {
    async fn record(&self, _entry: NewUsageLog) -> Result<i64, RepositoryError> {
        Err(RepositoryError::Storage("connection reset".to_string()))
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
        Err(RepositoryError::Storage("connection reset".to_string()))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Err(RepositoryError::Storage("connection reset".to_string()))
    }
}

/// Store whose writes take [`SlowStore::DELAY`] to complete.
pub struct SlowStore;

impl SlowStore {
    pub const DELAY: Duration = Duration::from_secs(3);
}

#[async_trait]
impl UsageLogRepository for SlowStore {
    async fn record(&self, _entry: NewUsageLog) -> Result<i64, RepositoryError> {
        tokio::time::sleep(Self::DELAY).await;
        Ok(1)
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<UsageLogEntry>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(0)
    }
}

/// Config pointing at `upstream` with short timeouts.
pub fn test_config(upstream: &str) -> BridgeConfig {
    BridgeConfig::for_upstream(upstream)
        .unwrap()
        .with_request_timeout(Duration::from_secs(2))
        .with_health_timeout(Duration::from_secs(1))
}

/// Router over `config`, logging to `store` when given.
pub fn router(config: BridgeConfig, store: Option<Arc<dyn UsageLogRepository>>) -> Router {
    create_router(BridgeState::new(config, store).unwrap())
}

/// POST a JSON body, optionally as `user`.
pub fn post_json(uri: &str, body: &Value, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", "Bearer test-key");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Send one request through the router and collect the response.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

pub fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        panic!("expected JSON ({e}), got: {}", String::from_utf8_lossy(body))
    })
}

/// Wait for the next detached write, failing the test after [`WRITE_WAIT`].
pub async fn next_row(rx: &mut mpsc::UnboundedReceiver<NewUsageLog>) -> NewUsageLog {
    tokio::time::timeout(WRITE_WAIT, rx.recv())
        .await
        .expect("usage row was not written in time")
        .expect("store channel closed")
}

/// Assert that no write arrives within a short window.
///
/// A closed channel counts as "no write": the router (and with it the
/// store) may already be dropped.
pub async fn assert_no_row(rx: &mut mpsc::UnboundedReceiver<NewUsageLog>) {
    let waited = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    if let Ok(Some(row)) = waited {
        panic!("unexpected usage row: {row:?}");
    }
}
