use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::GameError,
    extractors::{AppJson, ValidatedJson},
    game::{scoring::HIGH_SCORE_THRESHOLD, Effects, GameSession, GameSnapshot},
    metrics::record_stage_action,
    models::{
        game::{
            ClueAnswerRequest, CompleteIntroRequest, KeywordGuessRequest, PairSelectionRequest,
            QuizAnswerRequest, StartGameRequest,
        },
        leaderboard::{LeaderboardResponse, PlayerRecord},
    },
    services::AppState,
};

/// Body returned by every game action: what happened plus the new state.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T: Serialize> {
    pub outcome: T,
    pub game: GameSnapshot,
}

#[derive(Debug, Serialize)]
pub struct FiftyFiftyResponse {
    pub hidden_options: Vec<usize>,
    pub game: GameSnapshot,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardViewResponse {
    pub game: GameSnapshot,
    pub leaderboard: LeaderboardResponse,
}

#[derive(Debug, Serialize)]
pub struct GameResultResponse {
    pub record: PlayerRecord,
    /// 1-based position, absent when the record is not (yet) on the board.
    pub rank: Option<usize>,
    pub high_score: bool,
    pub leaderboard: LeaderboardResponse,
}

/// Runs `action` on game `id` and returns its output with a fresh snapshot.
async fn run_action<T>(
    state: &AppState,
    id: Uuid,
    metric_stage: &str,
    action: impl FnOnce(&mut GameSession, &mut Effects) -> Result<T, GameError>,
) -> Result<(T, GameSnapshot), GameError> {
    let runtime = state.games.get(id).await?;
    let mut runtime = runtime.lock().await;
    let result = runtime.act(action);
    record_stage_action(
        metric_stage,
        if result.is_ok() { "accepted" } else { "rejected" },
    );
    let output = result?;
    Ok((output, runtime.snapshot()))
}

pub async fn create_game(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (_, runtime) = state.games.create().await;
    let snapshot = runtime.lock().await.snapshot();
    (StatusCode::CREATED, Json(snapshot))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let runtime = state.games.get(id).await?;
    let snapshot = runtime.lock().await.snapshot();
    Ok(Json(snapshot))
}

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<StartGameRequest>,
) -> Result<impl IntoResponse, GameError> {
    let ((), game) = run_action(&state, id, "welcome", |session, fx| {
        session.start(&req.player_name, fx)
    })
    .await?;
    tracing::info!("Game {} started by {}", id, game.player_name);
    Ok(Json(game))
}

pub async fn complete_intro(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<CompleteIntroRequest>,
) -> Result<impl IntoResponse, GameError> {
    let ((), game) = run_action(&state, id, "intro", |session, fx| {
        session.complete_intro(req.stage, fx)
    })
    .await?;
    Ok(Json(game))
}

pub async fn answer_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<QuizAnswerRequest>,
) -> Result<impl IntoResponse, GameError> {
    let (outcome, game) = run_action(&state, id, "quiz", |session, fx| {
        session.answer_question(req.option, fx)
    })
    .await?;
    Ok(Json(ActionResponse { outcome, game }))
}

pub async fn use_fifty_fifty(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let (hidden_options, game) =
        run_action(&state, id, "quiz", |session, _| session.use_fifty_fifty()).await?;
    Ok(Json(FiftyFiftyResponse {
        hidden_options,
        game,
    }))
}

pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let ((), game) =
        run_action(&state, id, "quiz", |session, fx| session.next_question(fx)).await?;
    Ok(Json(game))
}

pub async fn select_left(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<PairSelectionRequest>,
) -> Result<impl IntoResponse, GameError> {
    let (outcome, game) = run_action(&state, id, "matching", |session, _| {
        session.select_left(req.pair_id)
    })
    .await?;
    Ok(Json(ActionResponse { outcome, game }))
}

pub async fn select_right(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<PairSelectionRequest>,
) -> Result<impl IntoResponse, GameError> {
    let (outcome, game) = run_action(&state, id, "matching", |session, fx| {
        session.select_right(req.pair_id, fx)
    })
    .await?;
    Ok(Json(ActionResponse { outcome, game }))
}

pub async fn answer_clue(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
    ValidatedJson(req): ValidatedJson<ClueAnswerRequest>,
) -> Result<impl IntoResponse, GameError> {
    let (outcome, game) = run_action(&state, id, "keyword", |session, _| {
        session.answer_clue(index, &req.answer)
    })
    .await?;
    Ok(Json(ActionResponse { outcome, game }))
}

pub async fn guess_keyword(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<KeywordGuessRequest>,
) -> Result<impl IntoResponse, GameError> {
    let (outcome, game) = run_action(&state, id, "keyword", |session, fx| {
        session.guess_keyword(&req.guess, fx)
    })
    .await?;
    tracing::info!("Game {} keyword guess: {:?}", id, outcome);
    Ok(Json(ActionResponse { outcome, game }))
}

pub async fn restart_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let ((), game) = run_action(&state, id, "session", |session, fx| {
        session.restart(fx);
        Ok(())
    })
    .await?;
    Ok(Json(game))
}

pub async fn open_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let ((), game) = run_action(&state, id, "leaderboard", |session, fx| {
        session.view_leaderboard(fx)
    })
    .await?;
    let leaderboard = state.leaderboard.top(state.leaderboard.default_limit()).await;
    Ok(Json(LeaderboardViewResponse { game, leaderboard }))
}

pub async fn leave_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let ((), game) = run_action(&state, id, "leaderboard", |session, fx| {
        session.leave_leaderboard(fx)
    })
    .await?;
    Ok(Json(game))
}

/// Final result of a finished game, ranked against the board as it is now.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let runtime = state.games.get(id).await?;
    let record = {
        let runtime = runtime.lock().await;
        let session = runtime.session();
        session
            .submitted_record()
            .cloned()
            .ok_or(GameError::InvalidTransition {
                stage: session.stage(),
                action: "view the result",
            })?
    };

    let leaderboard = state.leaderboard.top(state.leaderboard.default_limit()).await;
    let rank = leaderboard
        .entries
        .iter()
        .position(|entry| entry.id == record.id)
        .map(|index| index + 1);
    let high_score = record.score >= HIGH_SCORE_THRESHOLD;

    Ok(Json(GameResultResponse {
        record,
        rank,
        high_score,
        leaderboard,
    }))
}
