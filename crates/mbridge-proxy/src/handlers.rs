//! Route handlers.
//!
//! Every handler produces a response: upstream failures become JSON error
//! envelopes, never `Err` values handed back to axum.

use axum::{
    Json,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use mbridge_core::{
    NewUsageLog, RequestType, SERVICE_NAME, TokenUsage, USER_ID_HEADER, resolve_user_id,
};

use crate::forward::{UpstreamReply, forward_post, forward_request, method_carries_body};
use crate::models::{
    ErrorResponse, ResponseMetadata, StatusErrorResponse, StatusResponse, inject_metadata,
    now_rfc3339,
};
use crate::state::BridgeState;

// =============================================================================
// GET / and GET /status
// =============================================================================

/// Report bridge status together with the upstream's own health answer.
pub(crate) async fn status(State(state): State<BridgeState>) -> Response {
    let url = state.upstream_url("/health");
    debug!(%url, "Probing upstream health");

    let result = state
        .client
        .get(&url)
        .timeout(state.config.health_timeout)
        .send()
        .await;

    let response = match result {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, "Upstream health check failed");
            return status_error(e.to_string());
        }
    };

    let upstream_status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to read upstream health response");
            return status_error(e.to_string());
        }
    };

    if !upstream_status.is_success() {
        let text = String::from_utf8_lossy(&body);
        error!(status = %upstream_status, "Upstream health check returned an error");
        return status_error(format!("health endpoint returned {upstream_status}: {text}"));
    }

    let mistral = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

    Json(StatusResponse {
        status: "online",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        mistral,
        timestamp: now_rfc3339(),
    })
    .into_response()
}

fn status_error(reason: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusErrorResponse::new(reason)),
    )
        .into_response()
}

// =============================================================================
// POST /v1/chat/completions
// =============================================================================

pub(crate) async fn chat_completions(
    State(state): State<BridgeState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejected(&rejection),
    };
    forward_instrumented(&state, RequestType::Chat, &headers, body).await
}

// =============================================================================
// POST /v1/completions
// =============================================================================

pub(crate) async fn completions(
    State(state): State<BridgeState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejected(&rejection),
    };
    forward_instrumented(&state, RequestType::Completion, &headers, body).await
}

/// Answer an unreadable or oversized request body with a bridge error.
fn body_rejected(rejection: &BytesRejection) -> Response {
    let status = rejection.status();
    let reason = rejection.body_text();
    warn!(%status, %reason, "Rejected request body");

    let envelope = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorResponse::payload_too_large(&reason)
    } else {
        ErrorResponse::invalid_request_body(&reason)
    };
    (status, Json(envelope)).into_response()
}

/// Forward a completion request, then log usage without waiting on the write.
async fn forward_instrumented(
    state: &BridgeState,
    request_type: RequestType,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let user_id = resolve_user_id(
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
    );
    info!(%user_id, %request_type, "Forwarding completion request");

    let url = state.upstream_url(request_type.upstream_path());
    let reply = match forward_post(&state.client, &url, headers, body.clone()).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, %user_id, %request_type, "Request to upstream failed");
            return e.into_response();
        }
    };

    if !reply.status.is_success() {
        warn!(
            status = %reply.status,
            body = %String::from_utf8_lossy(&reply.body),
            %user_id,
            "Upstream returned an error; relaying"
        );
        return reply.into_response();
    }

    let duration_ms = reply.elapsed_ms();
    if state.usage.is_enabled() {
        let usage = TokenUsage::from_response_bytes(&reply.body);
        let entry = NewUsageLog::new(
            user_id,
            request_type,
            request_type.audit_prompt(&body),
            usage,
            duration_ms,
        );
        state.usage.record_detached(entry);
    }

    match state.config.attribution.as_deref() {
        Some(tag) => with_metadata(reply, tag).into_response(),
        None => reply.into_response(),
    }
}

/// Append `_metadata` when the upstream body is a JSON object.
fn with_metadata(reply: UpstreamReply, tag: &str) -> UpstreamReply {
    let metadata = ResponseMetadata {
        processed_by: tag.to_string(),
        timestamp: now_rfc3339(),
        latency_ms: reply.elapsed_ms(),
    };

    match inject_metadata(&reply.body, &metadata) {
        Some(body) => reply.with_body(body),
        None => reply,
    }
}

// =============================================================================
// ANY /v1/*
// =============================================================================

/// Relay any other `/v1/` request untouched. No usage is logged.
pub(crate) async fn passthrough(
    State(state): State<BridgeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejected(&rejection),
    };
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    info!(%method, path = %path_and_query, "Proxying request");

    let url = state.upstream_url(&path_and_query);
    let body = method_carries_body(&method).then_some(body);

    match forward_request(&state.client, &method, &url, &headers, body).await {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            error!(error = %e, path = %path_and_query, "Proxy request failed");
            e.into_response()
        }
    }
}
