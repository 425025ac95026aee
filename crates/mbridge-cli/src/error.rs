//! CLI-specific error types and exit codes.

use mbridge_core::{ConfigError, RepositoryError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics store error.
    #[error("Database error: {0}")]
    Database(String),

    /// The upstream failed its health probe.
    #[error("Upstream check failed: {0}")]
    Upstream(String),

    /// IO error (bind failure, log file, ...).
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where a category fits.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Upstream(_) => 1,
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Database(_) => 73, // EX_CANTCREAT (closest fit)
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<RepositoryError> for CliError {
    fn from(err: RepositoryError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
