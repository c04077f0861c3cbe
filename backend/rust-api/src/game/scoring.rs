//! Point rules for the three stages.
//!
//! Everything here is a pure function of the state handed in; the stage
//! engines decide *when* to call them.

use serde::Serialize;

pub const QUIZ_BASE_POINTS: u32 = 10;
pub const QUIZ_STREAK_STEP: u32 = 5;

pub const MATCH_POINTS: u32 = 20;
/// Deducted on a wrong pairing; the score never drops below zero.
pub const MISMATCH_PENALTY: u32 = 2;

pub const CLUE_POINTS: u32 = 20;
pub const KEYWORD_POINTS: u32 = 100;

/// Final score at or above this is celebrated on the result screen.
pub const HIGH_SCORE_THRESHOLD: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Lightning,
    Quick,
    Steady,
}

impl SpeedTier {
    pub fn bonus(&self) -> u32 {
        match self {
            SpeedTier::Lightning => 30,
            SpeedTier::Quick => 20,
            SpeedTier::Steady => 10,
        }
    }
}

/// Tier for a correct answer given the milliseconds left on the question clock.
/// Exactly 10.0s and 5.0s fall into the lower tier.
pub fn quiz_speed_tier(remaining_ms: u64) -> SpeedTier {
    if remaining_ms > 10_000 {
        SpeedTier::Lightning
    } else if remaining_ms > 5_000 {
        SpeedTier::Quick
    } else {
        SpeedTier::Steady
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizAward {
    pub base: u32,
    pub time_bonus: u32,
    pub streak_bonus: u32,
    pub total: u32,
    pub tier: SpeedTier,
}

/// Points for a correct answer. `streak_before` is the streak prior to this answer.
pub fn quiz_correct_award(remaining_ms: u64, streak_before: u32) -> QuizAward {
    let tier = quiz_speed_tier(remaining_ms);
    let time_bonus = tier.bonus();
    let streak_bonus = streak_before * QUIZ_STREAK_STEP;
    QuizAward {
        base: QUIZ_BASE_POINTS,
        time_bonus,
        streak_bonus,
        total: QUIZ_BASE_POINTS + time_bonus + streak_bonus,
        tier,
    }
}

pub fn apply_mismatch_penalty(score: u32) -> u32 {
    score.saturating_sub(MISMATCH_PENALTY)
}

/// Bonus added when the matching stage ends, tiered on whole seconds remaining.
pub fn matching_time_bonus(remaining_seconds: u32) -> u32 {
    if remaining_seconds > 60 {
        150
    } else if remaining_seconds > 30 {
        100
    } else {
        50
    }
}
