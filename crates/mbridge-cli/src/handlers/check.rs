//! Check command handler.
//!
//! Prints a short deployment report and fails when the upstream is down.

use reqwest::Client;

use mbridge_core::BridgeConfig;
use mbridge_db::redact;

use crate::diagnostics::{
    Diagnostics, RECOMMENDED_CORES, RECOMMENDED_MEMORY_BYTES, UpstreamHealth,
};
use crate::error::CliError;
use crate::parser::BridgeArgs;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Execute the check command.
pub async fn execute(config: &BridgeConfig, args: &BridgeArgs) -> Result<(), CliError> {
    let client = Client::builder()
        .build()
        .map_err(|e| CliError::Config(format!("HTTP client: {e}")))?;
    let diagnostics = Diagnostics::collect(&client, config, args).await;

    print_report(config, &diagnostics);

    match &diagnostics.upstream {
        UpstreamHealth::Healthy(_) => Ok(()),
        other => Err(CliError::Upstream(other.summary())),
    }
}

fn mark(ok: bool, required: bool) -> String {
    match (ok, required) {
        (true, _) => format!("{GREEN}✓{RESET}"),
        (false, true) => format!("{RED}✗{RESET}"),
        (false, false) => format!("{YELLOW}!{RESET}"),
    }
}

fn print_report(config: &BridgeConfig, diagnostics: &Diagnostics) {
    println!("{BOLD}Mistral API Bridge{RESET} v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", "-".repeat(40));

    println!("  Listen address:  {}", config.listen_addr());
    println!("  Upstream:        {}", config.upstream_url);
    println!(
        "  Metrics store:   {}",
        config
            .database_url
            .as_deref()
            .map_or_else(|| "disabled".to_string(), redact)
    );

    println!("\n{BOLD}Credentials:{RESET}");
    println!(
        "  {} MISTRAL_API_KEY {}",
        mark(diagnostics.api_key_set, false),
        if diagnostics.api_key_set { "set" } else { "not set" }
    );
    if let Some(agent_id) = &diagnostics.agent_id {
        println!("  {} MISTRAL_AGENT_ID {agent_id}", mark(true, false));
    }

    println!("\n{BOLD}Host:{RESET}");
    println!(
        "  {} {} CPU cores (recommended {RECOMMENDED_CORES})",
        mark(diagnostics.host.has_enough_cores(), false),
        diagnostics.host.cpu_cores
    );
    println!(
        "  {} {:.1} GiB memory (recommended {} GiB)",
        mark(diagnostics.host.has_enough_memory(), false),
        diagnostics.host.memory_gib(),
        RECOMMENDED_MEMORY_BYTES / (1024 * 1024 * 1024)
    );

    println!("\n{BOLD}Upstream health:{RESET}");
    println!(
        "  {} {}",
        mark(diagnostics.upstream.is_healthy(), true),
        diagnostics.upstream.summary()
    );
}
