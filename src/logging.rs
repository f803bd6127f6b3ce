use axum::{
    body::Body,
    http::{Request, Response},
    middleware::Next,
};
use colored::*;
use std::panic;
use tracing::{error, info, warn};
use tracing::{info_span, Instrument};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-chatline-request-id";

const DEFAULT_FILTER: &str = "chatline=info";

/// Installs the global subscriber. Logs always go to a daily rolling file;
/// `to_stderr` adds a console layer (off while the TUI owns the terminal).
/// Keep the returned guard alive for the lifetime of the process.
pub fn init_tracing(to_stderr: bool) -> WorkerGuard {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => DEFAULT_FILTER.into(),
    };

    let file_appender = tracing_appender::rolling::daily(".", "chatline.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = if to_stderr {
        Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(stderr_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    guard
}

/// Sets up a global panic hook that logs panics using tracing.
pub fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();

        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            target: "panic",
            message = %message,
            location = %location,
            backtrace = %backtrace,
            "FATAL: Application panicked"
        );

        original_hook(panic_info);
    }));
}

pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response<Body> {
    let request_id = Uuid::new_v4().to_string();
    if let Ok(val) = request_id.parse() {
        req.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(req).instrument(span).await;
    if let Ok(val) = request_id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}

/// One-line summary of an inbound chat body.
pub fn log_request_summary(request: &crate::types::ChatRequest) {
    let msg_count = request.messages.len();
    let last_role = match request.messages.last().and_then(|m| m.role.as_ref()) {
        Some(serde_json::Value::String(role)) => role.clone(),
        Some(other) => other.to_string(),
        None => "NONE".into(),
    };
    let malformed = request
        .messages
        .iter()
        .filter(|m| m.role.is_none() || m.content.is_none())
        .count();

    if malformed > 0 {
        warn!(
            target: "flight_recorder",
            "{}",
            format!("[REQ] {} entries missing role or content, forwarding as-is", malformed)
                .yellow()
        );
    }

    info!(
        target: "flight_recorder",
        "[REQ] Messages: {} | Last Role: {}",
        msg_count, last_role
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_request_id_header_is_echoed() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware));

        let response = match app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
        {
            Ok(r) => r,
            Err(e) => panic!("request failed: {}", e),
        };

        let id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        match id {
            Some(id) => assert!(Uuid::parse_str(&id).is_ok()),
            None => panic!("missing request id header"),
        }
    }
}
