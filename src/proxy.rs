use crate::constants::PLACEHOLDER_REPLY;
use crate::main_helper::ProxyConfig;
use crate::redaction::{redact_value, RedactionLevel};
use crate::specs::openai::{OpenAiErrorEnvelope, OpenAiMessage, OpenAiRequest, OpenAiResponse};
use crate::types::*;

/// Stateless bridge between local turns and the upstream completion API.
/// Each call is independent; the only shared pieces are the immutable config
/// and the pooled HTTP client.
pub struct CompletionProxy {
    client: reqwest::Client,
    config: ProxyConfig,
}

impl CompletionProxy {
    pub fn new(client: reqwest::Client, config: ProxyConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    fn credential(&self) -> Result<&str> {
        match self.config.api_key.as_deref() {
            Some(key) => Ok(key),
            None => Err(ChatError::MissingCredential.into()),
        }
    }

    /// Fails with the configuration error when no credential is set.
    pub fn ensure_configured(&self) -> Result<()> {
        self.credential().map(|_| ())
    }

    /// Entry point for the raw HTTP body. The credential is checked before the
    /// body is even looked at, and the body is parsed exactly once.
    pub async fn complete_body(&self, body: &[u8]) -> Result<Turn> {
        self.ensure_configured()?;
        let request = ChatRequest::from_slice(body)?;
        crate::logging::log_request_summary(&request);
        self.complete(&request.messages).await
    }

    #[tracing::instrument(
        name = "proxy.complete",
        skip_all,
        fields(
            turns = turns.len(),
            model.target = %self.config.model,
            http.status = tracing::field::Empty,
            proxy.outcome = tracing::field::Empty,
        )
    )]
    pub async fn complete(&self, turns: &[InboundTurn]) -> Result<Turn> {
        let span = tracing::Span::current();

        let key = match self.credential() {
            Ok(k) => k,
            Err(e) => {
                tracing::error!("[⚙️  -> ⚙️ ] {}", e.inner);
                span.record("proxy.outcome", "config_error");
                return Err(e);
            }
        };

        let outgoing = self.build_upstream_request(turns);
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(mut value) = serde_json::to_value(&outgoing) {
                redact_value(&mut value, RedactionLevel::default());
                tracing::debug!("[⚙️  -> ☁️ ] Upstream payload: {}", value);
            }
        }

        let result = self.execute_upstream_request(key, &outgoing).await;
        match &result {
            Ok(turn) => {
                span.record("proxy.outcome", "success");
                tracing::info!(
                    target: "flight_recorder",
                    "[RES] Content: TEXT[{}] {:?}",
                    turn.content().len(),
                    crate::str_utils::prefix_chars(turn.content(), 40)
                );
            }
            Err(e) => {
                // http.status is only recorded once an upstream status arrives.
                span.record("proxy.outcome", "upstream_error");
                tracing::error!("[☁️  -> ⚙️ ] Request Error: {}", e.inner);
            }
        }
        result
    }

    /// Prepends the fixed system turn and maps every incoming turn in order.
    pub fn build_upstream_request(&self, turns: &[InboundTurn]) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(OpenAiMessage::system(crate::constants::SYSTEM_PROMPT));
        messages.extend(turns.iter().map(OpenAiMessage::from));

        OpenAiRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
        }
    }

    async fn execute_upstream_request(&self, key: &str, outgoing: &OpenAiRequest) -> Result<Turn> {
        let response = self
            .client
            .post(&self.config.completions_url)
            .header("Authorization", format!("Bearer {}", key))
            .json(outgoing)
            .send()
            .await
            .map_err(ChatError::Network)?;

        let status = response.status();
        tracing::info!("[☁️  -> ⚙️ ] Status: {}", status);
        tracing::Span::current().record("http.status", status.as_u16());

        if !status.is_success() {
            let error_body = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to read error body: {}", e);
                    String::new()
                }
            };
            let message = match OpenAiErrorEnvelope::parse_message(&error_body) {
                Some(m) => m,
                None => match status.canonical_reason() {
                    Some(reason) => reason.to_string(),
                    None => status.to_string(),
                },
            };
            return Err(ChatError::Upstream(status, message).into());
        }

        let bytes = response.bytes().await.map_err(ChatError::Network)?;
        Ok(Turn::assistant(extract_reply(&bytes)))
    }
}

/// Reply text of a successful upstream body, or the placeholder when the body
/// is unreadable or carries no usable text.
pub fn extract_reply(body: &[u8]) -> String {
    match serde_json::from_slice::<OpenAiResponse>(body) {
        Ok(parsed) => match parsed.first_content() {
            Some(content) => content.to_string(),
            None => {
                tracing::warn!("Upstream returned no usable content, using placeholder");
                PLACEHOLDER_REPLY.to_string()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to parse upstream body: {}", e);
            PLACEHOLDER_REPLY.to_string()
        }
    }
}
