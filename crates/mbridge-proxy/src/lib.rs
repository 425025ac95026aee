#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod forward;
mod handlers;
pub mod models;
pub mod server;
pub mod state;
pub mod usage;

pub use forward::{UpstreamError, UpstreamReply, forward_post, forward_request};
pub use models::{ErrorResponse, ResponseMetadata, StatusErrorResponse, StatusResponse};
pub use server::{create_router, serve};
pub use state::BridgeState;
pub use usage::UsageRecorder;
