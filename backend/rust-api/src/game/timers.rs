//! Timer vocabulary shared by the session and stage engines.
//!
//! Game logic never spawns timers itself. It records [`Effect`]s and the
//! runtime that owns the session turns them into scheduled callbacks, feeding
//! each firing back through `GameSession::on_timer` together with the stage
//! epoch it was started in.

use std::time::Duration;

use serde::Serialize;

use crate::models::events::GameEvent;
use crate::models::leaderboard::PlayerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerSlot {
    IntroAdvance,
    QuestionCountdown,
    StageClock,
    RoundCountdown,
    MatchFeedback,
    MismatchClear,
    ResultHold,
}

impl TimerSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerSlot::IntroAdvance => "intro_advance",
            TimerSlot::QuestionCountdown => "question_countdown",
            TimerSlot::StageClock => "stage_clock",
            TimerSlot::RoundCountdown => "round_countdown",
            TimerSlot::MatchFeedback => "match_feedback",
            TimerSlot::MismatchClear => "mismatch_clear",
            TimerSlot::ResultHold => "result_hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Once,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    pub slot: TimerSlot,
    pub period: Duration,
    pub mode: TimerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replaces whatever timer currently occupies the slot.
    StartTimer(TimerSpec),
    CancelTimer(TimerSlot),
    CancelAllTimers,
    SubmitResult(PlayerRecord),
    Notify(GameEvent),
}

/// Whether a repeating timer should keep firing after the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    Continue,
    Stop,
}

#[derive(Debug, Default)]
pub struct Effects(Vec<Effect>);

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(&mut self, slot: TimerSlot, delay: Duration) {
        self.0.push(Effect::StartTimer(TimerSpec {
            slot,
            period: delay,
            mode: TimerMode::Once,
        }));
    }

    pub fn every(&mut self, slot: TimerSlot, period: Duration) {
        self.0.push(Effect::StartTimer(TimerSpec {
            slot,
            period,
            mode: TimerMode::Repeat,
        }));
    }

    pub fn cancel(&mut self, slot: TimerSlot) {
        self.0.push(Effect::CancelTimer(slot));
    }

    pub fn cancel_all(&mut self) {
        self.0.push(Effect::CancelAllTimers);
    }

    pub fn notify(&mut self, event: GameEvent) {
        self.0.push(Effect::Notify(event));
    }

    pub fn submit(&mut self, record: PlayerRecord) {
        self.0.push(Effect::SubmitResult(record));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Effect] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Effect> {
        self.0
    }

    /// Timers started (and not later cancelled) by the recorded effects.
    pub fn started(&self) -> Vec<TimerSlot> {
        let mut active: Vec<TimerSlot> = Vec::new();
        for effect in &self.0 {
            match effect {
                Effect::StartTimer(spec) => {
                    active.retain(|slot| *slot != spec.slot);
                    active.push(spec.slot);
                }
                Effect::CancelTimer(slot) => active.retain(|s| s != slot),
                Effect::CancelAllTimers => active.clear(),
                _ => {}
            }
        }
        active
    }

    pub fn cancels(&self, slot: TimerSlot) -> bool {
        self.0.iter().any(|effect| match effect {
            Effect::CancelTimer(s) => *s == slot,
            Effect::CancelAllTimers => true,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_tracks_cancellations() {
        let mut fx = Effects::new();
        fx.every(TimerSlot::StageClock, Duration::from_secs(1));
        fx.every(TimerSlot::QuestionCountdown, Duration::from_millis(100));
        fx.cancel(TimerSlot::QuestionCountdown);
        assert_eq!(fx.started(), vec![TimerSlot::StageClock]);

        fx.cancel_all();
        fx.once(TimerSlot::ResultHold, Duration::from_secs(3));
        assert_eq!(fx.started(), vec![TimerSlot::ResultHold]);
        assert!(fx.cancels(TimerSlot::StageClock));
    }
}
