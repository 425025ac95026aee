//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the bridge expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - Repositories are append/read only; nothing mutates a stored row

pub mod usage_log_repository;

use thiserror::Error;

pub use usage_log_repository::UsageLogRepository;

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// so the request path can log a failed write without knowing the backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend error (connection, missing table, constraint, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored value could not be mapped back into a domain type.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The connection string names a backend this build cannot talk to.
    #[error("Unsupported database backend: {0}")]
    UnsupportedBackend(String),
}
