//! Response envelopes produced by the bridge itself.
//!
//! Upstream payloads are relayed as raw bytes and never pass through these
//! types; only bridge-level errors, the status document and the optional
//! `_metadata` object are modelled here.

use serde::Serialize;
use serde_json::Value;

// =============================================================================
// Error Response Types
// =============================================================================

/// Error type tag for every bridge-generated error.
pub const BRIDGE_ERROR_TYPE: &str = "bridge_error";

/// Error response matching the OpenAI error shape.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: String,
    /// Underlying cause, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Create a bridge error response.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: BRIDGE_ERROR_TYPE.to_string(),
                code: code.into(),
                detail: None,
            },
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.error.detail = Some(detail.into());
        self
    }

    /// The upstream could not be reached at all.
    pub fn upstream_unreachable(reason: &str) -> Self {
        Self::new(
            "Failed to connect to the Mistral service",
            "upstream_unreachable",
        )
        .with_detail(reason)
    }

    /// The upstream did not answer within the configured bound.
    pub fn upstream_timeout(reason: &str) -> Self {
        Self::new(
            "The Mistral service did not respond in time",
            "upstream_timeout",
        )
        .with_detail(reason)
    }

    /// The upstream answered but its body could not be read.
    pub fn upstream_read_failed(reason: &str) -> Self {
        Self::new(
            "Failed to read the Mistral service response",
            "upstream_read_failed",
        )
        .with_detail(reason)
    }

    /// The request body exceeded the configured limit.
    pub fn payload_too_large(reason: &str) -> Self {
        Self::new("Request body is too large", "payload_too_large").with_detail(reason)
    }

    /// The request body could not be read.
    pub fn invalid_request_body(reason: &str) -> Self {
        Self::new("Failed to read the request body", "invalid_request_body").with_detail(reason)
    }

    /// A handler panicked.
    pub fn internal(reason: &str) -> Self {
        Self::new("Internal bridge error", "internal_error").with_detail(reason)
    }
}

// =============================================================================
// Status Endpoint Types
// =============================================================================

/// Body of a successful `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Whatever the upstream health endpoint returned (JSON, or text as a string).
    pub mistral: Value,
    pub timestamp: String,
}

/// Body of a failed `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub error: String,
    pub timestamp: String,
}

impl StatusErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: "Failed to reach the Mistral service".to_string(),
            error: error.into(),
            timestamp: now_rfc3339(),
        }
    }
}

// =============================================================================
// Metadata Envelope
// =============================================================================

/// Non-schema `_metadata` object appended to successful JSON responses.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub processed_by: String,
    pub timestamp: String,
    pub latency_ms: u64,
}

/// Key under which [`ResponseMetadata`] is inserted.
pub const METADATA_KEY: &str = "_metadata";

/// Insert `_metadata` into a JSON object body.
///
/// Returns `None` when the body is not a JSON object; callers then relay
/// the original bytes untouched.
pub fn inject_metadata(body: &[u8], metadata: &ResponseMetadata) -> Option<Vec<u8>> {
    let mut json: Value = serde_json::from_slice(body).ok()?;
    let object = json.as_object_mut()?;
    object.insert(METADATA_KEY.to_string(), serde_json::to_value(metadata).ok()?);
    serde_json::to_vec(&json).ok()
}

/// Current UTC time in RFC 3339, millisecond precision.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
