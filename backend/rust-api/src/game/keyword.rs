//! Stage 3: four clue tiles guarding a hidden keyword.
//!
//! A wrong keyword guess ends the game on the spot; the score is left as it
//! was and every tile is revealed.

use std::time::Duration;

use serde::Serialize;

use super::rules::{GameRules, CLOCK_PERIOD};
use super::scoring::{CLUE_POINTS, KEYWORD_POINTS};
use super::text::{matches_any, normalize_answer};
use super::timers::{Effects, TimerControl, TimerSlot};
use super::StageReport;
use crate::error::GameError;
use crate::models::content::KeywordPuzzle;
use crate::models::events::{ClockTick, GameEvent, StageCompleted};

const STAGE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueOutcome {
    Unlocked,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordOutcome {
    Solved,
    Failed,
}

#[derive(Debug)]
pub struct KeywordStage {
    puzzle: KeywordPuzzle,
    unlocked: Vec<bool>,
    score: u32,
    total_seconds: u32,
    outcome: Option<KeywordOutcome>,
    result_hold: Duration,
}

impl KeywordStage {
    pub fn new(puzzle: KeywordPuzzle, rules: &GameRules, initial_score: u32, initial_time: u32) -> Self {
        let unlocked = vec![false; puzzle.clues.len()];
        Self {
            puzzle,
            unlocked,
            score: initial_score,
            total_seconds: initial_time,
            outcome: None,
            result_hold: rules.result_hold(STAGE),
        }
    }

    pub fn enter(&mut self, fx: &mut Effects) {
        fx.every(TimerSlot::StageClock, CLOCK_PERIOD);
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Answers the clue behind tile `index`. Wrong answers may be retried freely.
    pub fn answer_clue(&mut self, index: usize, answer: &str) -> Result<ClueOutcome, GameError> {
        if self.is_finished() {
            return Err(GameError::StageOver);
        }
        let clue = self
            .puzzle
            .clues
            .get(index)
            .ok_or(GameError::UnknownClue(index))?;
        if self.unlocked[index] {
            return Err(GameError::ClueAlreadyUnlocked(index));
        }

        if matches_any(answer, &clue.answers) {
            self.unlocked[index] = true;
            self.score += CLUE_POINTS;
            tracing::debug!("Clue {} unlocked, score={}", clue.id, self.score);
            Ok(ClueOutcome::Unlocked)
        } else {
            Ok(ClueOutcome::Incorrect)
        }
    }

    /// Single terminal guess at the keyword.
    pub fn guess_keyword(&mut self, guess: &str, fx: &mut Effects) -> Result<KeywordOutcome, GameError> {
        if self.is_finished() {
            return Err(GameError::StageOver);
        }

        let solved = !guess.trim().is_empty()
            && normalize_answer(guess) == normalize_answer(&self.puzzle.keyword);
        let outcome = if solved {
            self.score += KEYWORD_POINTS;
            KeywordOutcome::Solved
        } else {
            KeywordOutcome::Failed
        };

        self.outcome = Some(outcome);
        self.unlocked.iter_mut().for_each(|tile| *tile = true);

        fx.cancel(TimerSlot::StageClock);
        fx.once(TimerSlot::ResultHold, self.result_hold);
        fx.notify(GameEvent::StageCompleted(StageCompleted {
            stage: STAGE,
            score: self.score,
            time_seconds: self.total_seconds,
        }));
        tracing::info!(
            "Keyword stage finished: outcome={:?}, score={}, total={}s",
            outcome,
            self.score,
            self.total_seconds
        );
        Ok(outcome)
    }

    pub fn on_timer(
        &mut self,
        slot: TimerSlot,
        fx: &mut Effects,
    ) -> (TimerControl, Option<StageReport>) {
        match slot {
            TimerSlot::StageClock if !self.is_finished() => {
                self.total_seconds += 1;
                fx.notify(GameEvent::ClockTick(ClockTick {
                    elapsed_seconds: self.total_seconds,
                }));
                (TimerControl::Continue, None)
            }
            TimerSlot::ResultHold if self.is_finished() => (
                TimerControl::Stop,
                Some(StageReport {
                    score: self.score,
                    time_seconds: self.total_seconds,
                }),
            ),
            _ => (TimerControl::Stop, None),
        }
    }

    pub fn view(&self) -> KeywordView {
        KeywordView {
            description: self.puzzle.description.clone(),
            keyword_length: self
                .puzzle
                .keyword
                .chars()
                .filter(|c| !c.is_whitespace())
                .count(),
            tiles: self
                .puzzle
                .clues
                .iter()
                .zip(&self.unlocked)
                .enumerate()
                .map(|(index, (clue, unlocked))| TileView {
                    index,
                    question: clue.question.clone(),
                    hint: clue.hint.clone(),
                    unlocked: *unlocked,
                })
                .collect(),
            score: self.score,
            total_seconds: self.total_seconds,
            outcome: self.outcome,
            keyword: self.outcome.map(|_| self.puzzle.keyword.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TileView {
    pub index: usize,
    pub question: String,
    pub hint: String,
    pub unlocked: bool,
}

#[derive(Debug, Serialize)]
pub struct KeywordView {
    pub description: String,
    pub keyword_length: usize,
    pub tiles: Vec<TileView>,
    pub score: u32,
    pub total_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<KeywordOutcome>,
    /// Hidden until the stage is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}
