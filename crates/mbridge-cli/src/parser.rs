//! Main CLI parser and top-level argument handling.
//!
//! Every bridge setting can come from a flag or its environment variable;
//! flags win. A `.env` file is loaded before parsing.

use std::net::IpAddr;

use clap::{Args, Parser, ValueEnum};

use crate::commands::Commands;

/// Console log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Command-line interface for the Mistral API bridge.
#[derive(Parser)]
#[command(name = "mbridge")]
#[command(about = "Forward Mistral-compatible API calls and record per-user usage")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Console log format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long = "log-file", env = "BRIDGE_LOG_FILE", global = true)]
    pub log_file: Option<String>,

    #[command(flatten)]
    pub bridge: BridgeArgs,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct BridgeArgs {
    /// Interface to listen on
    #[arg(long, env = "BRIDGE_HOST", global = true)]
    pub host: Option<IpAddr>,

    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Fallback port variable used by older deployments
    #[arg(long = "api-port", env = "API_PORT", hide = true, global = true)]
    pub api_port: Option<u16>,

    /// Base URL of the Mistral-compatible upstream
    #[arg(long = "mistral-url", env = "MISTRAL_URL", global = true)]
    pub mistral_url: Option<String>,

    /// Metrics store connection string (postgres:// or sqlite:)
    #[arg(long = "database-url", env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    /// Timeout for forwarded requests, in seconds
    #[arg(long = "request-timeout-secs", env = "BRIDGE_REQUEST_TIMEOUT_SECS", global = true)]
    pub request_timeout_secs: Option<u64>,

    /// Timeout for the upstream health probe, in seconds
    #[arg(long = "health-timeout-secs", env = "BRIDGE_HEALTH_TIMEOUT_SECS", global = true)]
    pub health_timeout_secs: Option<u64>,

    /// Tag successful responses with `_metadata.processed_by`
    #[arg(long, env = "BRIDGE_ATTRIBUTION", global = true)]
    pub attribution: Option<String>,

    /// Maximum request body size, in MiB
    #[arg(long = "body-limit-mb", env = "BRIDGE_BODY_LIMIT_MB", global = true)]
    pub body_limit_mb: Option<usize>,

    /// Allowed CORS origin (repeatable); all origins when omitted
    #[arg(
        long = "cors-origin",
        env = "BRIDGE_CORS_ORIGINS",
        value_delimiter = ',',
        global = true
    )]
    pub cors_origins: Vec<String>,

    /// Upstream API key; only checked for presence at startup
    #[arg(
        long = "mistral-api-key",
        env = "MISTRAL_API_KEY",
        hide_env_values = true,
        hide = true,
        global = true
    )]
    pub mistral_api_key: Option<String>,

    /// Agent id reported at startup
    #[arg(long = "mistral-agent-id", env = "MISTRAL_AGENT_ID", hide = true, global = true)]
    pub mistral_agent_id: Option<String>,
}
