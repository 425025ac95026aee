//! Request forwarding to the upstream inference endpoint.
//!
//! Bodies travel as raw bytes in both directions. The bridge never
//! validates request schemas; whatever the upstream answers is relayed.

use std::time::{Duration, Instant};

use axum::{
    Json,
    body::Body,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::models::ErrorResponse;

/// Inbound headers copied onto the upstream request.
///
/// Everything else (host, content-length, hop-by-hop headers, the bridge's
/// own `x-user-id`) stays behind; `content-type` is always set to JSON.
const FORWARDED_HEADERS: &[&str] = &["authorization", "accept"];

/// Check if a header should be forwarded.
fn should_forward_header(name: &str) -> bool {
    let lower = name.to_lowercase();
    FORWARDED_HEADERS.contains(&lower.as_str())
}

/// Methods whose body is forwarded on the pass-through route.
pub fn method_carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Failure to obtain a response from the upstream.
///
/// Upstream HTTP errors are not represented here: a 4xx/5xx reply is a
/// successful exchange and is relayed through [`UpstreamReply`].
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection refused, DNS failure, TLS failure, reset...
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// No complete answer within the configured bound.
    #[error("upstream timed out: {0}")]
    Timeout(String),

    /// Headers arrived but the body could not be read.
    #[error("failed to read upstream response: {0}")]
    ReadFailed(String),
}

impl UpstreamError {
    fn from_send(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }

    fn from_read(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::ReadFailed(err.to_string())
        }
    }

    /// Bridge error envelope for this failure.
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::Unreachable(reason) => ErrorResponse::upstream_unreachable(reason),
            Self::Timeout(reason) => ErrorResponse::upstream_timeout(reason),
            Self::ReadFailed(reason) => ErrorResponse::upstream_read_failed(reason),
        }
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(self.to_error_response()),
        )
            .into_response()
    }
}

/// A fully read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
    /// Time from dispatch until the body was fully read.
    pub elapsed: Duration,
}

impl UpstreamReply {
    /// Elapsed time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Replace the body, keeping status and content type.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        Response::builder()
            .status(self.status)
            .header(header::CONTENT_TYPE, self.content_type)
            .body(Body::from(self.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Forward a request to the upstream and read the whole response.
///
/// # Arguments
///
/// * `client` - Shared HTTP client (carries the request timeout)
/// * `method` - Method to use upstream
/// * `url` - Full upstream URL including query string
/// * `headers` - Inbound request headers; only an allow-list is copied
/// * `body` - Body to send, if any
pub async fn forward_request(
    client: &Client,
    method: &Method,
    url: &str,
    headers: &HeaderMap,
    body: Option<Bytes>,
) -> Result<UpstreamReply, UpstreamError> {
    debug!(%method, %url, "Forwarding to upstream");

    let upstream_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

    let mut req_builder = client
        .request(upstream_method, url)
        .header("content-type", "application/json");

    for (name, value) in headers {
        if should_forward_header(name.as_str())
            && let Ok(value_str) = value.to_str()
        {
            req_builder = req_builder.header(name.as_str(), value_str);
        }
    }

    if let Some(body) = body {
        req_builder = req_builder.body(body);
    }

    let start = Instant::now();
    let response = req_builder
        .send()
        .await
        .map_err(|e| UpstreamError::from_send(&e))?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let body = response
        .bytes()
        .await
        .map_err(|e| UpstreamError::from_read(&e))?;

    Ok(UpstreamReply {
        status,
        content_type,
        body,
        elapsed: start.elapsed(),
    })
}

/// POST a JSON body to the upstream.
pub async fn forward_post(
    client: &Client,
    url: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<UpstreamReply, UpstreamError> {
    forward_request(client, &Method::POST, url, headers, Some(body)).await
}
