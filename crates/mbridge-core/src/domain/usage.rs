//! Usage accounting domain types.
//!
//! One `UsageLogEntry` is recorded per successfully forwarded completion
//! request. Entries are append-only: nothing in the bridge updates or
//! deletes them.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User id recorded when the caller does not identify itself.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Kind of forwarded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// `POST /v1/chat/completions`
    Chat,
    /// `POST /v1/completions`
    Completion,
}

impl RequestType {
    /// Parse a request type from its stored representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "completion" => Some(Self::Completion),
            _ => None,
        }
    }

    /// Stored representation (`chat` / `completion`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Completion => "completion",
        }
    }

    /// Upstream path this request type is forwarded to.
    #[must_use]
    pub const fn upstream_path(&self) -> &'static str {
        match self {
            Self::Chat => "/v1/chat/completions",
            Self::Completion => "/v1/completions",
        }
    }

    /// Build the audit string stored in the `prompt` column.
    ///
    /// Chat requests store the compact JSON of `messages` (or the whole
    /// body when `messages` is missing). Completion requests store the
    /// `prompt` string verbatim; non-string prompts are stored as JSON.
    /// A body that is not JSON at all is stored as lossy UTF-8.
    #[must_use]
    pub fn audit_prompt(&self, body: &[u8]) -> String {
        let Ok(json) = serde_json::from_slice::<Value>(body) else {
            return String::from_utf8_lossy(body).into_owned();
        };

        match self {
            Self::Chat => match json.get("messages") {
                Some(messages) => messages.to_string(),
                None => json.to_string(),
            },
            Self::Completion => match json.get("prompt") {
                Some(Value::String(prompt)) => prompt.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            },
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token counts reported by the upstream `usage` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Extract usage from an upstream completion response body.
    ///
    /// Missing, negative or non-numeric counts default to 0.
    #[must_use]
    pub fn from_response(body: &Value) -> Self {
        let count = |field: &str| {
            body.get("usage")
                .and_then(|usage| usage.get(field))
                .and_then(Value::as_u64)
                .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
        };

        Self {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
        }
    }

    /// Same as [`TokenUsage::from_response`], starting from raw bytes.
    #[must_use]
    pub fn from_response_bytes(body: &[u8]) -> Self {
        serde_json::from_slice::<Value>(body)
            .map(|json| Self::from_response(&json))
            .unwrap_or_default()
    }
}

/// Resolve the caller's user id from the raw header value.
#[must_use]
pub fn resolve_user_id(header: Option<&str>) -> String {
    header
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

/// A usage row to be appended to the metrics store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUsageLog {
    pub user_id: String,
    pub request_type: RequestType,
    pub prompt: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub duration_ms: u64,
}

impl NewUsageLog {
    /// Assemble a row from the pieces gathered while forwarding.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        request_type: RequestType,
        prompt: impl Into<String>,
        usage: TokenUsage,
        duration_ms: u64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            request_type,
            prompt: prompt.into(),
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            duration_ms,
        }
    }
}

/// A persisted usage row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: i64,
    pub user_id: String,
    pub request_type: RequestType,
    pub prompt: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub duration_ms: u64,
    pub created_at: NaiveDateTime,
}
