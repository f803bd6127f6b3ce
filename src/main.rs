use chatline::client::ProxyClient;
use chatline::conversation::CompletionBackend;
use chatline::main_helper::{build_http_client, Args, ChatArgs, Command, ProxyConfig, ServeArgs};
use chatline::proxy::CompletionProxy;
use chatline::tui::App;
use chatline::AppState;

use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // The chat screen owns the terminal, so it only logs to file.
    let to_stderr = matches!(args.command, Command::Serve(_));
    let guard = chatline::logging::init_tracing(to_stderr);
    chatline::logging::setup_panic_hook();

    let code = match args.command {
        Command::Serve(serve_args) => run_serve(serve_args).await,
        Command::Chat(chat_args) => run_chat(chat_args).await,
    };
    drop(guard);
    std::process::exit(code);
}

async fn run_serve(args: ServeArgs) -> i32 {
    let config = ProxyConfig::from_env(&args.upstream);
    if !config.has_credential() {
        tracing::warn!(
            "{} is missing or empty; every chat request will fail until it is set",
            chatline::constants::CREDENTIAL_ENV_VAR
        );
    }

    let client = match build_http_client(&args.upstream) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {}", e);
            return 1;
        }
    };

    let state = Arc::new(AppState::new(CompletionProxy::new(client, config)));
    match chatline::server::serve(state, &args.host, args.port, args.max_body_size).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            1
        }
    }
}

async fn run_chat(args: ChatArgs) -> i32 {
    let client = match build_http_client(&args.upstream) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {}", e);
            return 1;
        }
    };

    let backend: Arc<dyn CompletionBackend> = match args.proxy_url.as_deref() {
        Some(url) => {
            let proxy_client = ProxyClient::new(client, url);
            tracing::info!("Chatting through proxy at {}", proxy_client.endpoint());
            Arc::new(proxy_client)
        }
        None => {
            tracing::info!("Chatting through in-process proxy");
            let config = ProxyConfig::from_env(&args.upstream);
            Arc::new(CompletionProxy::new(client, config))
        }
    };

    match App::new(backend).run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("TUI Error: {}", e);
            1
        }
    }
}
