//! Serve command handler.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mbridge_core::BridgeConfig;
use mbridge_proxy::BridgeState;

use crate::bootstrap::bootstrap;
use crate::diagnostics::Diagnostics;
use crate::error::CliError;
use crate::parser::BridgeArgs;

/// Execute the serve command.
///
/// Runs startup diagnostics (never fatal), binds the listener and serves
/// until Ctrl-C or SIGTERM.
pub async fn execute(config: BridgeConfig, args: &BridgeArgs) -> Result<(), CliError> {
    let addr = config.listen_addr();
    let state = bootstrap(config).await?;

    Diagnostics::collect(&state.client, &state.config, args)
        .await
        .log();

    listen(addr, state)
        .await
        .map_err(|e| CliError::Io(format!("{e:#}")))
}

/// Bind `addr` and serve `state` until a shutdown signal arrives.
async fn listen(addr: SocketAddr, state: BridgeState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    mbridge_proxy::serve(listener, state, cancel)
        .await
        .context("bridge server stopped with an error")
}

/// Cancel `token` on Ctrl-C or, on Unix, SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_conflict_is_reported_with_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let state = BridgeState::new(BridgeConfig::default(), None).unwrap();

        let err = listen(addr, state).await.unwrap_err();
        assert!(format!("{err:#}").contains(&format!("failed to bind {addr}")));
    }
}
