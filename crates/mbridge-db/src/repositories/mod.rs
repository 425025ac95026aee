//! Repository implementations using sqlx.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The pools are confined to this module and never exposed through
//! the port trait signatures.

mod postgres_usage_log_repository;
mod row_mappers;
mod sqlite_usage_log_repository;

pub use postgres_usage_log_repository::PostgresUsageLogRepository;
pub use sqlite_usage_log_repository::SqliteUsageLogRepository;
