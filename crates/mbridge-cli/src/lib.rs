#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{bootstrap, load_env, resolve_config};
pub use commands::Commands;
pub use error::CliError;
pub use parser::{BridgeArgs, Cli, LogFormat};
