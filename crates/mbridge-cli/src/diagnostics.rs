//! Startup diagnostics.
//!
//! Checks the things that most often break a deployment: missing upstream
//! credentials, an undersized host and an upstream that is not answering.
//! Nothing here is fatal for `serve`; `check` turns a failed probe into a
//! non-zero exit.

use reqwest::Client;
use sysinfo::System;
use tracing::{info, warn};

use mbridge_core::BridgeConfig;

use crate::parser::BridgeArgs;

/// CPU cores below which a warning is logged.
pub const RECOMMENDED_CORES: usize = 4;

/// Memory below which a warning is logged.
pub const RECOMMENDED_MEMORY_BYTES: u64 = 8 * 1024 * 1024 * 1024;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// CPU and memory of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub cpu_cores: usize,
    pub total_memory_bytes: u64,
}

impl HostResources {
    /// Probe the current host.
    pub fn detect() -> Self {
        let system = System::new_all();
        Self {
            cpu_cores: system.cpus().len(),
            total_memory_bytes: system.total_memory(),
        }
    }

    pub const fn has_enough_cores(&self) -> bool {
        self.cpu_cores >= RECOMMENDED_CORES
    }

    pub const fn has_enough_memory(&self) -> bool {
        self.total_memory_bytes >= RECOMMENDED_MEMORY_BYTES
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn memory_gib(&self) -> f64 {
        self.total_memory_bytes as f64 / BYTES_PER_GIB
    }
}

/// Outcome of one `GET {upstream}/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamHealth {
    /// 2xx, with the body as text.
    Healthy(String),
    /// Reachable but answered with an error status.
    Unhealthy { status: u16, body: String },
    /// No answer within the health timeout.
    Unreachable(String),
}

impl UpstreamHealth {
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy(_))
    }

    /// One-line description for reports and errors.
    pub fn summary(&self) -> String {
        match self {
            Self::Healthy(body) => format!("healthy ({})", body.trim()),
            Self::Unhealthy { status, body } => format!("HTTP {status}: {}", body.trim()),
            Self::Unreachable(reason) => format!("unreachable: {reason}"),
        }
    }
}

/// Probe the upstream health endpoint, bounded by `config.health_timeout`.
pub async fn probe_upstream(client: &Client, config: &BridgeConfig) -> UpstreamHealth {
    let url = config.upstream_endpoint("/health");
    let response = match client
        .get(&url)
        .timeout(config.health_timeout)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return UpstreamHealth::Unreachable(e.to_string()),
    };

    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return UpstreamHealth::Unreachable(e.to_string()),
    };

    if status.is_success() {
        UpstreamHealth::Healthy(body)
    } else {
        UpstreamHealth::Unhealthy {
            status: status.as_u16(),
            body,
        }
    }
}

/// Everything `serve` logs at startup and `check` prints.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub api_key_set: bool,
    pub agent_id: Option<String>,
    pub host: HostResources,
    pub upstream: UpstreamHealth,
}

impl Diagnostics {
    pub async fn collect(client: &Client, config: &BridgeConfig, args: &BridgeArgs) -> Self {
        let api_key_set = args
            .mistral_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());

        Self {
            api_key_set,
            agent_id: args
                .mistral_agent_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            host: HostResources::detect(),
            upstream: probe_upstream(client, config).await,
        }
    }

    /// Emit the findings as log events.
    pub fn log(&self) {
        if self.api_key_set {
            info!("MISTRAL_API_KEY is set");
        } else {
            warn!("MISTRAL_API_KEY is not set; upstream calls rely on caller credentials");
        }
        if let Some(agent_id) = &self.agent_id {
            info!(%agent_id, "Mistral agent configured");
        }

        info!(
            cpu_cores = self.host.cpu_cores,
            memory_gib = %format!("{:.1}", self.host.memory_gib()),
            "Host resources"
        );
        if !self.host.has_enough_cores() {
            warn!(
                cpu_cores = self.host.cpu_cores,
                recommended = RECOMMENDED_CORES,
                "Fewer CPU cores than recommended for local inference"
            );
        }
        if !self.host.has_enough_memory() {
            warn!(
                memory_gib = %format!("{:.1}", self.host.memory_gib()),
                recommended_gib = RECOMMENDED_MEMORY_BYTES / (1024 * 1024 * 1024),
                "Less memory than recommended for local inference"
            );
        }

        if self.upstream.is_healthy() {
            info!(upstream = %self.upstream.summary(), "Upstream reachable");
        } else {
            warn!(
                upstream = %self.upstream.summary(),
                "Upstream health check failed; serving anyway"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> BridgeConfig {
        BridgeConfig::for_upstream(&server.uri())
            .unwrap()
            .with_health_timeout(Duration::from_millis(500))
    }

    #[test]
    fn test_host_thresholds() {
        let small = HostResources {
            cpu_cores: 2,
            total_memory_bytes: 4 * 1024 * 1024 * 1024,
        };
        assert!(!small.has_enough_cores());
        assert!(!small.has_enough_memory());
        assert!((small.memory_gib() - 4.0).abs() < f64::EPSILON);

        let large = HostResources {
            cpu_cores: 8,
            total_memory_bytes: RECOMMENDED_MEMORY_BYTES,
        };
        assert!(large.has_enough_cores());
        assert!(large.has_enough_memory());
    }

    #[test]
    fn test_detect_reports_cores() {
        assert!(HostResources::detect().cpu_cores > 0);
    }

    #[tokio::test]
    async fn test_probe_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let health = probe_upstream(&Client::new(), &config_for(&server)).await;
        assert_eq!(health, UpstreamHealth::Healthy("ok".to_string()));
    }

    #[tokio::test]
    async fn test_probe_unhealthy_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .mount(&server)
            .await;

        let health = probe_upstream(&Client::new(), &config_for(&server)).await;
        assert!(!health.is_healthy());
        assert_eq!(health.summary(), "HTTP 503: loading");
    }

    #[tokio::test]
    async fn test_probe_unreachable() {
        let config = BridgeConfig::for_upstream("http://127.0.0.1:1")
            .unwrap()
            .with_health_timeout(Duration::from_millis(500));

        let health = probe_upstream(&Client::new(), &config).await;
        assert!(matches!(health, UpstreamHealth::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_collect_ignores_blank_credentials() {
        let args = BridgeArgs {
            mistral_api_key: Some("  ".to_string()),
            mistral_agent_id: Some("ag-123".to_string()),
            ..BridgeArgs::default()
        };
        let config = BridgeConfig::for_upstream("http://127.0.0.1:1")
            .unwrap()
            .with_health_timeout(Duration::from_millis(200));

        let diagnostics = Diagnostics::collect(&Client::new(), &config, &args).await;
        assert!(!diagnostics.api_key_set);
        assert_eq!(diagnostics.agent_id.as_deref(), Some("ag-123"));
    }
}
