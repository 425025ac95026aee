//! Axum HTTP server for the bridge.
//!
//! This module provides `create_router()` and the `serve()` function that runs
//! the bridge on a pre-bound `TcpListener`.

use std::any::Any;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use mbridge_core::CorsConfig;

use crate::handlers;
use crate::models::ErrorResponse;
use crate::state::BridgeState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin)
        }
    }
}

/// Turn a handler panic into a 500 bridge error.
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let reason = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(reason, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal(reason)),
    )
        .into_response()
}

/// Build the bridge router.
///
/// Non-POST requests to the two instrumented paths fall through to the
/// generic pass-through, as does anything else under `/v1/`. Paths outside
/// `/v1/` other than `/` and `/status` are answered with a plain 404.
pub fn create_router(state: BridgeState) -> Router {
    let cors = build_cors_layer(&state.config.cors);
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/", get(handlers::status))
        .route("/status", get(handlers::status))
        .route(
            "/v1/chat/completions",
            post(handlers::chat_completions).fallback(handlers::passthrough),
        )
        .route(
            "/v1/completions",
            post(handlers::completions).fallback(handlers::passthrough),
        )
        .route("/v1/{*path}", any(handlers::passthrough))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Start the bridge with a pre-bound listener.
///
/// Runs until `cancel` is triggered, then drains in-flight requests.
///
/// # Returns
///
/// Returns `Ok(())` on clean shutdown, or an error if the server fails.
pub async fn serve(
    listener: TcpListener,
    state: BridgeState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let upstream = state.config.upstream_url.clone();
    let logging = state.usage.is_enabled();

    let app = create_router(state);

    info!(%addr, %upstream, usage_logging = logging, "Bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Bridge shut down");
    Ok(())
}
