use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

pub mod games;
pub mod leaderboard;
pub mod sse;

/// Liveness plus the leaderboard backend currently serving requests.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend = state.leaderboard.backend();
    let redis_status = match (&state.config.redis_uri, backend.as_str()) {
        (None, _) => "not_configured",
        (Some(_), "redis") => "healthy",
        (Some(_), _) => "unavailable",
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "history-quiz-api",
            "version": env!("CARGO_PKG_VERSION"),
            "games_active": state.games.len().await,
            "dependencies": {
                "leaderboard": {
                    "backend": backend.as_str(),
                    "redis": redis_status,
                }
            }
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic Auth against `metrics.auth` (user:password).
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let encoded = auth_header
        .strip_prefix("Basic ")
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        tracing::warn!("Rejected /metrics request with invalid credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
