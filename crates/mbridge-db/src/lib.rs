#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

// Re-export factory for convenient access
pub use factory::{StoreBackend, StoreFactory, redact};

// Re-export repository implementations
pub use repositories::{PostgresUsageLogRepository, SqliteUsageLogRepository};

// Re-export setup functions for convenient access
pub use setup::{ensure_postgres_schema, ensure_sqlite_schema};
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
