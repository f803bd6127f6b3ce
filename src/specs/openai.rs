use serde::{Deserialize, Serialize};

/// --- OPENAI CHAT COMPLETIONS SCHEMA (non-streaming subset) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    pub max_tokens: u32,
}

/// Fields are forwarded exactly as the caller sent them. Missing fields stay
/// missing on the wire; the proxy does not fill them in or rename roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAiMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl OpenAiMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: Some(serde_json::Value::String("system".to_string())),
            content: Some(serde_json::Value::String(content.to_string())),
        }
    }
}

impl From<&crate::types::InboundTurn> for OpenAiMessage {
    fn from(turn: &crate::types::InboundTurn) -> Self {
        Self {
            role: turn.role.clone(),
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChoice {
    #[serde(default)]
    pub message: Option<OpenAiResponseMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenAiResponse {
    /// Trimmed text of the first choice, if there is any non-blank text.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiErrorEnvelope {
    #[serde(default)]
    pub error: Option<OpenAiErrorDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiErrorDetails {
    #[serde(default)]
    pub message: Option<String>,
}

impl OpenAiErrorEnvelope {
    pub fn parse_message(body: &str) -> Option<String> {
        serde_json::from_str::<OpenAiErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
    }
}
