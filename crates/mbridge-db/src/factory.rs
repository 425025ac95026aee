//! Composition utilities for building a usage store from a connection string.
//!
//! This module is focused purely on construction and should not contain
//! any domain logic.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info};

use mbridge_core::{RepositoryError, UsageLogRepository};

use crate::repositories::{PostgresUsageLogRepository, SqliteUsageLogRepository};
use crate::setup::{ensure_postgres_schema, ensure_sqlite_schema};

/// Upper bound on pooled connections to the metrics store.
const MAX_CONNECTIONS: u32 = 10;

/// How long a write may wait for a free connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Database backend selected from the connection string scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Sqlite,
}

impl StoreBackend {
    /// Detect the backend from a `DATABASE_URL`.
    pub fn from_url(url: &str) -> Result<Self, RepositoryError> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(RepositoryError::UnsupportedBackend(redact(url))),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Strip credentials so a connection string can be logged.
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// Factory for creating usage repositories.
///
/// This struct provides composition utilities only, no domain logic.
pub struct StoreFactory;

impl StoreFactory {
    /// Connect to the metrics store and ensure its schema.
    ///
    /// A connection failure is returned to the caller, which runs with
    /// logging disabled. A schema failure is only logged: the store stays
    /// attached and individual writes report their own errors.
    pub async fn connect(url: &str) -> Result<Arc<dyn UsageLogRepository>, RepositoryError> {
        let backend = StoreBackend::from_url(url)?;

        match backend {
            StoreBackend::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .acquire_timeout(ACQUIRE_TIMEOUT)
                    .connect(url)
                    .await
                    .map_err(|e| RepositoryError::Storage(e.to_string()))?;

                if let Err(e) = ensure_postgres_schema(&pool).await {
                    error!(error = %e, "Failed to initialize usage table");
                }

                info!(backend = backend.as_str(), url = %redact(url), "Connected to metrics store");
                Ok(Arc::new(PostgresUsageLogRepository::new(pool)))
            }
            StoreBackend::Sqlite => {
                let options = SqliteConnectOptions::from_str(url)
                    .map_err(|e| RepositoryError::Storage(e.to_string()))?
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .acquire_timeout(ACQUIRE_TIMEOUT)
                    .connect_with(options)
                    .await
                    .map_err(|e| RepositoryError::Storage(e.to_string()))?;

                if let Err(e) = ensure_sqlite_schema(&pool).await {
                    error!(error = %e, "Failed to initialize usage table");
                }

                info!(backend = backend.as_str(), url = %url, "Connected to metrics store");
                Ok(Arc::new(SqliteUsageLogRepository::new(pool)))
            }
        }
    }
}
