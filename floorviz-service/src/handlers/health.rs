use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

/// Liveness probe for container orchestrators and local smoke checks.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "floorviz-service",
            "version": env!("CARGO_PKG_VERSION"),
            "heif_support": state.codec.heif_supported(),
            "mock_mode": state.config.server.mock_mode,
            "provider_configured": state.provider.is_some(),
        })),
    )
}
