use serde::{Deserialize, Serialize};

use super::game::GameStage;
use super::leaderboard::PlayerRecord;

/// Pushed to `/games/{id}/stream` subscribers whenever server-side state moves
/// without a client request (timers) or after an accepted action.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GameEvent {
    StageChanged(StageChanged),
    QuestionTick(QuestionTick),
    ClockTick(ClockTick),
    CountdownTick(CountdownTick),
    TimeExpired(TimeExpired),
    RoundStarted(RoundStarted),
    SelectionCleared,
    StageCompleted(StageCompleted),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StageChanged {
    pub stage: GameStage,
    pub score: u32,
    pub time_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuestionTick {
    pub question_number: usize,
    pub remaining_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClockTick {
    pub elapsed_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CountdownTick {
    pub remaining_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimeExpired {
    pub stage: u8,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoundStarted {
    pub round: usize,
}

/// A stage reached its terminal state; the result is held on screen before
/// the session moves on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StageCompleted {
    pub stage: u8,
    pub score: u32,
    pub time_seconds: u32,
}

impl GameEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            GameEvent::StageChanged(_) => "stage-changed",
            GameEvent::QuestionTick(_) => "question-tick",
            GameEvent::ClockTick(_) => "clock-tick",
            GameEvent::CountdownTick(_) => "countdown-tick",
            GameEvent::TimeExpired(_) => "time-expired",
            GameEvent::RoundStarted(_) => "round-started",
            GameEvent::SelectionCleared => "selection-cleared",
            GameEvent::StageCompleted(_) => "stage-completed",
        }
    }
}

/// Pushed to `/leaderboard/stream` subscribers on every stored result.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LeaderboardInsert {
    pub record: PlayerRecord,
}
