use crate::constants::*;
use crate::proxy::CompletionProxy;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the completion proxy HTTP server
    Serve(ServeArgs),
    /// Chat from the terminal
    Chat(ChatArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_size: usize,
    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of a running `chatline serve`. Without it the proxy runs in-process.
    #[arg(long)]
    pub proxy_url: Option<String>,
    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UpstreamArgs {
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
    #[arg(long, default_value = OPENAI_CHAT_COMPLETIONS)]
    pub completions_url: String,
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamArgs {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            completions_url: OPENAI_CHAT_COMPLETIONS.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

/// Process-wide proxy configuration, built once at startup and injected into
/// [`CompletionProxy`].
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub api_key: Option<String>,
    pub completions_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completions_url: OPENAI_CHAT_COMPLETIONS.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ProxyConfig {
    pub fn from_args(args: &UpstreamArgs, api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            completions_url: args.completions_url.clone(),
            model: args.model.clone(),
            max_tokens: args.max_tokens,
        }
    }

    /// Reads the credential from the environment. An empty value counts as missing.
    pub fn from_env(args: &UpstreamArgs) -> Self {
        let api_key = match std::env::var(CREDENTIAL_ENV_VAR) {
            Ok(k) => Some(k),
            Err(_) => None,
        };
        Self::from_args(args, api_key)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

pub fn build_http_client(args: &UpstreamArgs) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_secs))
        .connect_timeout(Duration::from_secs(args.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()
}

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<CompletionProxy>,
}

impl AppState {
    pub fn new(proxy: CompletionProxy) -> Self {
        Self {
            proxy: Arc::new(proxy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let cfg = ProxyConfig::from_args(&UpstreamArgs::default(), Some("   ".to_string()));
        assert!(!cfg.has_credential());

        let cfg = ProxyConfig::from_args(&UpstreamArgs::default(), Some("sk-test".to_string()));
        assert!(cfg.has_credential());
    }

    #[test]
    fn test_cli_parses_serve_defaults() {
        let args = match Args::try_parse_from(["chatline", "serve"]) {
            Ok(a) => a,
            Err(e) => panic!("parse failed: {}", e),
        };
        match args.command {
            Command::Serve(s) => {
                assert_eq!(s.port, 3000);
                assert_eq!(s.upstream.model, DEFAULT_MODEL);
                assert_eq!(s.upstream.max_tokens, DEFAULT_MAX_TOKENS);
            }
            Command::Chat(_) => panic!("expected serve"),
        }
    }

    #[test]
    fn test_cli_parses_chat_proxy_url() {
        let args = match Args::try_parse_from([
            "chatline",
            "chat",
            "--proxy-url",
            "http://127.0.0.1:3000",
        ]) {
            Ok(a) => a,
            Err(e) => panic!("parse failed: {}", e),
        };
        match args.command {
            Command::Chat(c) => assert_eq!(c.proxy_url.as_deref(), Some("http://127.0.0.1:3000")),
            Command::Serve(_) => panic!("expected chat"),
        }
    }
}
