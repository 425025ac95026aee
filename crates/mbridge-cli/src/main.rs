//! CLI entry point - the composition root.
//!
//! Loads `.env`, parses arguments, installs logging and dispatches to a
//! handler. Errors are mapped to process exit codes here and nowhere else.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use mbridge_cli::logging::{init_tracing, install_panic_hook};
use mbridge_cli::{Cli, CliError, Commands, handlers, load_env, resolve_config};

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli.bridge)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => handlers::serve::execute(config, &cli.bridge).await,
        Commands::Check => handlers::check::execute(&config, &cli.bridge).await,
        Commands::Logs { limit, json } => handlers::logs::execute(&config, limit, json).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads them
    let env_file = load_env();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; the guard flushes the log file when dropped
    let log_file = cli.log_file.as_deref().map(Path::new);
    let guard = match init_tracing(cli.verbose, cli.log_format, log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(e.exit_code());
        }
    };
    install_panic_hook();

    if let Some(path) = env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let code = match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    };

    drop(guard);
    code
}
