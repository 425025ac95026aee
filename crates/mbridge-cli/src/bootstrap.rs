//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together:
//! - `BridgeConfig` from parsed arguments
//! - the metrics store (via mbridge-db)
//! - the bridge state (via mbridge-proxy)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use mbridge_core::{BridgeConfig, CorsConfig, UsageLogRepository, resolve_port};
use mbridge_db::{StoreFactory, redact};
use mbridge_proxy::BridgeState;

use crate::error::CliError;
use crate::parser::BridgeArgs;

/// Load `.env` from the working directory. Real environment variables win.
///
/// Returns the file that was loaded, if any.
pub fn load_env() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Resolve the runtime configuration from parsed arguments.
pub fn resolve_config(args: &BridgeArgs) -> Result<BridgeConfig, CliError> {
    let mut config = match args.mistral_url.as_deref() {
        Some(url) => BridgeConfig::for_upstream(url)?,
        None => BridgeConfig::default(),
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    config.port = resolve_port(args.port, args.api_port);

    if let Some(secs) = args.request_timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.health_timeout_secs {
        config = config.with_health_timeout(Duration::from_secs(secs));
    }
    if let Some(mb) = args.body_limit_mb {
        config.body_limit_bytes = mb.saturating_mul(1024 * 1024);
    }

    config.cors = CorsConfig::from_origins(args.cors_origins.clone());
    config = config
        .with_database_url(args.database_url.clone())
        .with_attribution(args.attribution.clone());

    config.validate()?;
    Ok(config)
}

/// Open the metrics store, or `None` when logging is disabled.
///
/// A store that cannot be reached disables logging with a warning; the
/// bridge itself still starts.
pub async fn connect_store(config: &BridgeConfig) -> Option<Arc<dyn UsageLogRepository>> {
    let Some(url) = config.database_url.as_deref() else {
        info!("DATABASE_URL not set; usage logging disabled");
        return None;
    };

    match StoreFactory::connect(url).await {
        Ok(store) => {
            info!(database = %redact(url), "Usage logging enabled");
            Some(store)
        }
        Err(e) => {
            warn!(
                error = %e,
                database = %redact(url),
                "Metrics store unavailable; usage logging disabled"
            );
            None
        }
    }
}

/// Build the shared bridge state for `config`.
pub async fn bootstrap(config: BridgeConfig) -> Result<BridgeState, CliError> {
    let store = connect_store(&config).await;
    BridgeState::new(config, store).map_err(|e| CliError::Config(format!("HTTP client: {e}")))
}
