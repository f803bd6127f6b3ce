use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing_error::SpanTrace;

use crate::constants::{GENERIC_FAILURE_MESSAGE, MISSING_CREDENTIAL_MESSAGE};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a conversation. Fields are private so a turn cannot be
/// edited after it has been appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A turn as received on the wire, kept verbatim. `None` means the key was
/// absent; an explicit `null` is `Some(Value::Null)` and is forwarded as such.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InboundTurn {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl From<&Turn> for InboundTurn {
    fn from(turn: &Turn) -> Self {
        Self {
            role: Some(serde_json::Value::String(turn.role().as_str().to_string())),
            content: Some(serde_json::Value::String(turn.content().to_string())),
        }
    }
}

impl InboundTurn {
    /// Lenient conversion from an arbitrary JSON entry. Non-object entries
    /// carry neither field; nothing is validated or rewritten.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            role: value.get("role").cloned(),
            content: value.get("content").cloned(),
        }
    }
}

/// Body accepted by `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<InboundTurn>,
}

impl ChatRequest {
    /// `messages` that is missing or not an array is treated as empty.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(body)?;
        let messages = match raw.get("messages").and_then(|m| m.as_array()) {
            Some(entries) => entries.iter().map(InboundTurn::from_value).collect(),
            None => Vec::new(),
        };
        Ok(Self { messages })
    }
}

/// Body returned by `POST /api/chat` on success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub message: Turn,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingCredential,

    #[error("Upstream error (status {0}): {1}")]
    Upstream(axum::http::StatusCode, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Proxy rejected the request (status {0})")]
    ProxyRejected(axum::http::StatusCode),

    #[error("Request body rejected: {0}")]
    InvalidBody(String),
}

impl ChatError {
    /// Status and user-facing message for the HTTP boundary.
    pub fn status_and_message(&self) -> (axum::http::StatusCode, String, &'static str) {
        use axum::http::StatusCode;
        match self {
            ChatError::MissingCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                MISSING_CREDENTIAL_MESSAGE.to_string(),
                "CONFIGURATION_ERROR",
            ),
            ChatError::Upstream(s, m) => (*s, format!("OpenAI API error: {}", m), "UPSTREAM_ERROR"),
            ChatError::ProxyRejected(s) => (*s, GENERIC_FAILURE_MESSAGE.to_string(), "PROXY_ERROR"),
            ChatError::Network(_) | ChatError::Serialization(_) | ChatError::InvalidBody(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_FAILURE_MESSAGE.to_string(),
                "INTERNAL_ERROR",
            ),
        }
    }
}

impl axum::response::IntoResponse for ObservedError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, code) = self.inner.status_and_message();
        (
            status,
            axum::Json(serde_json::json!({
                "error": msg,
                "code": code,
            })),
        )
            .into_response()
    }
}

#[derive(Debug)]
pub struct ObservedError {
    pub inner: ChatError,
    pub span_trace: SpanTrace,
}

impl ObservedError {
    pub fn status(&self) -> axum::http::StatusCode {
        self.inner.status_and_message().0
    }

    pub fn message(&self) -> String {
        self.inner.status_and_message().1
    }
}

impl std::fmt::Display for ObservedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\nSpan Trace:\n{}", self.inner, self.span_trace)
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E> From<E> for ObservedError
where
    E: Into<ChatError>,
{
    fn from(error: E) -> Self {
        Self {
            inner: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;
