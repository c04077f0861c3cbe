//! Game rules and state machines. Nothing in here touches the clock or the
//! network: timers and leaderboard writes are requested as [`Effect`]s.

pub mod keyword;
pub mod matching;
pub mod quiz;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod text;
pub mod timers;

use serde::Serialize;

pub use rules::{GameRules, InvalidRules};
pub use session::{GameSession, GameSnapshot};
pub use timers::{Effect, Effects, TimerControl, TimerMode, TimerSlot, TimerSpec};

/// Cumulative totals handed from a finished stage back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub score: u32,
    pub time_seconds: u32,
}
