use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid game rules: {0}")]
pub struct InvalidRules(&'static str);

/// Tunable pacing of a game. Point values live in [`super::scoring`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// One-time 50/50 lifeline in the quiz stage.
    pub fifty_fifty: bool,
    pub stage1_intro_ms: u64,
    pub stage2_intro_ms: u64,
    pub question_time_ms: u64,
    pub question_tick_ms: u64,
    pub matching_time_secs: u32,
    pub match_feedback_ms: u64,
    pub quiz_result_hold_ms: u64,
    pub matching_result_hold_ms: u64,
    pub keyword_result_hold_ms: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            fifty_fifty: true,
            stage1_intro_ms: 3_500,
            stage2_intro_ms: 4_000,
            question_time_ms: 15_000,
            question_tick_ms: 100,
            matching_time_secs: 120,
            match_feedback_ms: 800,
            quiz_result_hold_ms: 3_000,
            matching_result_hold_ms: 4_500,
            keyword_result_hold_ms: 4_000,
        }
    }
}

impl GameRules {
    /// Rejects pacing the timers cannot run with.
    pub fn validate(&self) -> Result<(), InvalidRules> {
        if self.question_time_ms == 0 {
            return Err(InvalidRules("question_time_ms must be positive"));
        }
        if self.question_tick_ms == 0 {
            return Err(InvalidRules("question_tick_ms must be positive"));
        }
        if self.question_tick_ms > self.question_time_ms {
            return Err(InvalidRules(
                "question_tick_ms must not exceed question_time_ms",
            ));
        }
        if self.matching_time_secs == 0 {
            return Err(InvalidRules("matching_time_secs must be positive"));
        }
        Ok(())
    }

    /// Auto-advance delay for an intro screen; `None` means the player must confirm.
    pub fn intro_delay(&self, stage: u8) -> Option<Duration> {
        match stage {
            1 => Some(Duration::from_millis(self.stage1_intro_ms)),
            2 => Some(Duration::from_millis(self.stage2_intro_ms)),
            _ => None,
        }
    }

    pub fn question_tick(&self) -> Duration {
        Duration::from_millis(self.question_tick_ms)
    }

    pub fn match_feedback(&self) -> Duration {
        Duration::from_millis(self.match_feedback_ms)
    }

    pub fn result_hold(&self, stage: u8) -> Duration {
        let ms = match stage {
            1 => self.quiz_result_hold_ms,
            2 => self.matching_result_hold_ms,
            _ => self.keyword_result_hold_ms,
        };
        Duration::from_millis(ms)
    }
}

pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_are_valid() {
        assert_eq!(GameRules::default().validate(), Ok(()));
    }

    #[test]
    fn zero_or_oversized_periods_are_rejected() {
        let zero_tick = GameRules {
            question_tick_ms: 0,
            ..GameRules::default()
        };
        assert!(zero_tick.validate().is_err());

        let no_question_time = GameRules {
            question_time_ms: 0,
            ..GameRules::default()
        };
        assert!(no_question_time.validate().is_err());

        let tick_too_long = GameRules {
            question_tick_ms: 20_000,
            ..GameRules::default()
        };
        assert!(tick_too_long.validate().is_err());

        let no_matching_time = GameRules {
            matching_time_secs: 0,
            ..GameRules::default()
        };
        assert!(no_matching_time.validate().is_err());
    }
}
