//! Bridge configuration types and validation.
//!
//! These are pure configuration types with no infrastructure dependencies.
//! The CLI resolves flags and environment variables into a `BridgeConfig`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default listen port for the bridge.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upstream inference endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8000";

/// Default bound for a forwarded completion request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default bound for the upstream health probe.
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Default inbound body limit, in MiB.
pub const DEFAULT_BODY_LIMIT_MB: usize = 50;

/// Service name reported by the status endpoint.
pub const SERVICE_NAME: &str = "Mistral API Bridge";

/// Errors raised while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid upstream URL '{url}': {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("{name} must be greater than zero")]
    InvalidTimeout { name: &'static str },

    #[error("Body limit must be greater than zero")]
    InvalidBodyLimit,
}

/// CORS configuration for the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins.
    #[default]
    AllowAll,
    /// Allow specific origins.
    AllowOrigins(Vec<String>),
}

impl CorsConfig {
    /// Build from a list of origins; an empty list allows everything.
    #[must_use]
    pub fn from_origins(origins: Vec<String>) -> Self {
        let origins: Vec<String> = origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::AllowAll
        } else {
            Self::AllowOrigins(origins)
        }
    }
}

/// Resolved runtime configuration for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Interface to listen on.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Upstream base URL, without a trailing slash.
    pub upstream_url: String,
    /// Metrics store connection string. `None` disables usage logging.
    pub database_url: Option<String>,
    /// Bound for forwarded requests.
    pub request_timeout: Duration,
    /// Bound for the upstream health probe.
    pub health_timeout: Duration,
    /// When set, successful JSON responses carry a `_metadata` object
    /// with this value as `processed_by`.
    pub attribution: Option<String>,
    /// Maximum accepted inbound body size.
    pub body_limit_bytes: usize,
    pub cors: CorsConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            database_url: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
            attribution: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
            cors: CorsConfig::AllowAll,
        }
    }
}

impl BridgeConfig {
    /// Config pointing at the given upstream, everything else defaulted.
    pub fn for_upstream(upstream_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            upstream_url: normalize_upstream_url(upstream_url)?,
            ..Self::default()
        })
    }

    /// Set the metrics store connection string. Empty strings disable logging.
    #[must_use]
    pub fn with_database_url(mut self, database_url: Option<String>) -> Self {
        self.database_url = database_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Set the attribution tag used for `_metadata` injection.
    #[must_use]
    pub fn with_attribution(mut self, attribution: Option<String>) -> Self {
        self.attribution = attribution.filter(|tag| !tag.trim().is_empty());
        self
    }

    /// Set the forwarded request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the health probe timeout.
    #[must_use]
    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Address the server binds to.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Full upstream URL for a path beginning with `/`.
    #[must_use]
    pub fn upstream_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.upstream_url, path)
    }

    /// Check invariants that the builder methods cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_upstream_url(&self.upstream_url)?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                name: "request timeout",
            });
        }
        if self.health_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                name: "health timeout",
            });
        }
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidBodyLimit);
        }
        Ok(())
    }
}

/// Validate an upstream base URL and strip any trailing slash.
pub fn normalize_upstream_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| ConfigError::InvalidUpstreamUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Pick the listen port: `PORT` wins over `API_PORT`, then the default.
#[must_use]
pub fn resolve_port(port: Option<u16>, api_port: Option<u16>) -> u16 {
    port.or(api_port).unwrap_or(DEFAULT_PORT)
}
