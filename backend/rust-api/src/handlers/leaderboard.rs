use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{models::leaderboard::LeaderboardQuery, services::AppState};

/// GET /api/v1/leaderboard?limit=N
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let limit = query.effective_limit(state.leaderboard.default_limit());
    tracing::debug!("Leaderboard requested: limit={}", limit);
    Json(state.leaderboard.top(limit).await)
}
