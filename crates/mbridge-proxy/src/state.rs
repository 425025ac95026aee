//! Shared state for the bridge handlers.

use std::sync::Arc;

use reqwest::Client;

use mbridge_core::{BridgeConfig, UsageLogRepository};

use crate::usage::UsageRecorder;

/// Idle keep-alive connections kept per upstream host.
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Shared bridge state, cloneable and injected via Axum `State`.
///
/// Holds no per-request data: one HTTP client, the resolved configuration
/// and the optional metrics store are shared by every request.
#[derive(Clone)]
pub struct BridgeState {
    /// HTTP client for forwarding requests to the upstream.
    pub client: Client,
    pub config: Arc<BridgeConfig>,
    pub usage: UsageRecorder,
}

impl BridgeState {
    /// Build state for `config`, logging to `store` when one is given.
    ///
    /// The client carries `config.request_timeout` as its default bound;
    /// the health probe overrides it per request.
    pub fn new(
        config: BridgeConfig,
        store: Option<Arc<dyn UsageLogRepository>>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .connect_timeout(config.request_timeout.min(config.health_timeout))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
            usage: UsageRecorder::from_option(store),
        })
    }

    /// Full upstream URL for `path_and_query`.
    pub fn upstream_url(&self, path_and_query: &str) -> String {
        self.config.upstream_endpoint(path_and_query)
    }
}
