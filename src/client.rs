use crate::constants::CHAT_ROUTE;
use crate::conversation::CompletionBackend;
use crate::types::*;
use async_trait::async_trait;

/// Talks to a running proxy over HTTP, the way the browser page did.
pub struct ProxyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ProxyClient {
    /// `base_url` is the proxy origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHAT_ROUTE),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for ProxyClient {
    async fn complete(&self, turns: &[Turn]) -> Result<Turn> {
        let body = serde_json::json!({ "messages": turns });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(ChatError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("[⚙️  -> 🖥️ ] Proxy returned {}", status);
            return Err(ChatError::ProxyRejected(status).into());
        }

        let bytes = response.bytes().await.map_err(ChatError::Network)?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_route() {
        let c = ProxyClient::new(reqwest::Client::new(), "http://localhost:3000/");
        assert_eq!(c.endpoint(), "http://localhost:3000/api/chat");
    }
}
