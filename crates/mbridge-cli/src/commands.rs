//! Subcommands.

use clap::Subcommand;

/// Default number of rows shown by `logs`.
pub const DEFAULT_LOGS_LIMIT: u32 = 20;

/// Available commands for the bridge.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge server (default)
    Serve,

    /// Check host resources and upstream reachability, then exit
    Check,

    /// Show the most recent usage rows from the metrics store
    Logs {
        /// Number of rows to show
        #[arg(short, long, default_value_t = DEFAULT_LOGS_LIMIT)]
        limit: u32,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}
