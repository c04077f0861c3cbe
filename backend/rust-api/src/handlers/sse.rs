use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    error::GameError,
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::events::{GameEvent, LeaderboardInsert, StageChanged},
    services::AppState,
};

/// Keeps `sse_connections_active` in step with open streams.
struct ConnectionGuard;

impl ConnectionGuard {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        ConnectionGuard
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Turns a broadcast receiver into a stream that skips over lag and ends
/// when the sender goes away.
fn follow<T, F>(
    receiver: broadcast::Receiver<T>,
    label: String,
    to_event: F,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Event + Send + 'static,
{
    let guard = ConnectionGuard::open();
    stream::unfold(
        (receiver, guard, label, to_event),
        |(mut receiver, guard, label, to_event)| async move {
            loop {
                match receiver.recv().await {
                    Ok(item) => {
                        let event = to_event(item);
                        return Some((Ok(event), (receiver, guard, label, to_event)));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("SSE client {} lagged, skipped {} events", label, skipped);
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("SSE stream closed: {}", label);
                        return None;
                    }
                }
            }
        },
    )
}

fn game_event(event: GameEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.to_sse_data())
}

/// SSE endpoint for game events
/// GET /api/v1/games/{id}/stream
pub async fn game_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GameError> {
    let runtime = state.games.get(id).await?;
    let (receiver, current) = {
        let runtime = runtime.lock().await;
        let session = runtime.session();
        let current = GameEvent::StageChanged(StageChanged {
            stage: session.stage(),
            score: session.score(),
            time_seconds: session.time_seconds(),
        });
        (runtime.subscribe(), current)
    };
    // the stream must not keep the game alive past eviction
    drop(runtime);
    tracing::info!("Client connected to SSE stream: game={}", id);

    let initial = stream::once(async move { Ok(game_event(current)) });
    let updates = follow(receiver, format!("game={}", id), game_event);

    Ok(Sse::new(initial.chain(updates)).keep_alive(KeepAlive::default()))
}

/// SSE endpoint for new leaderboard entries
/// GET /api/v1/leaderboard/stream
pub async fn leaderboard_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("Client connected to leaderboard SSE stream");
    let receiver = state.leaderboard.subscribe();
    let stream = follow(
        receiver,
        "leaderboard".to_string(),
        |insert: LeaderboardInsert| {
            Event::default()
                .event("leaderboard-insert")
                .data(serde_json::to_string(&insert).unwrap_or_else(|_| "{}".to_string()))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}
