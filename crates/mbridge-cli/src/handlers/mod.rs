//! Command handlers.
//!
//! Each handler takes the resolved `BridgeConfig` and returns
//! `Result<(), CliError>`; `main` maps errors to exit codes.

pub mod check;
pub mod logs;
pub mod serve;
