use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use crate::AppState;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub credential: &'static str,
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "ok" })
}

/// Unready while no provider credential is configured: every chat request
/// would fail with a configuration error.
pub async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    if state.proxy.config().has_credential() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                credential: "ok",
            }),
        )
    } else {
        tracing::error!("Readiness check: {} missing", crate::constants::CREDENTIAL_ENV_VAR);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "unready",
                credential: "missing",
            }),
        )
    }
}
