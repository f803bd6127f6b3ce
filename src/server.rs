use crate::constants::CHAT_ROUTE;
use crate::logging::request_id_middleware;
use crate::main_helper::AppState;
use crate::types::*;
use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;

/// `POST /api/chat`. The body is taken raw so that a missing credential wins
/// over a malformed or oversized body, and so that every failure leaves as the
/// JSON error envelope instead of an extractor rejection.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            if let Err(e) = state.proxy.ensure_configured() {
                return e.into_response();
            }
            tracing::warn!("[🖥️  -> ⚙️ ] Body rejected: {}", rejection.body_text());
            return ObservedError::from(ChatError::InvalidBody(rejection.body_text())).into_response();
        }
    };

    match state.proxy.complete_body(&body).await {
        Ok(message) => (StatusCode::OK, Json(ChatResponse { message })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route(CHAT_ROUTE, post(chat_handler))
        .route("/health", get(crate::health::liveness))
        .route("/readyz", get(crate::health::readiness))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, host: &str, port: u16, max_body_size: usize) -> std::io::Result<()> {
    let app = router(state, max_body_size);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("chatline proxy listening on {}", addr);
    axum::serve(listener, app).await
}
