#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{
    BridgeConfig, ConfigError, CorsConfig, DEFAULT_BODY_LIMIT_MB, DEFAULT_HEALTH_TIMEOUT_SECS,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_UPSTREAM_URL, SERVICE_NAME,
    normalize_upstream_url, resolve_port,
};
pub use domain::{
    ANONYMOUS_USER, NewUsageLog, RequestType, TokenUsage, USER_ID_HEADER, UsageLogEntry,
    resolve_user_id,
};
pub use ports::{RepositoryError, UsageLogRepository};
