//! Domain types for the bridge.
//!
//! These types are independent of HTTP and storage concerns.

pub mod usage;

pub use usage::{
    ANONYMOUS_USER, NewUsageLog, RequestType, TokenUsage, USER_ID_HEADER, UsageLogEntry,
    resolve_user_id,
};
