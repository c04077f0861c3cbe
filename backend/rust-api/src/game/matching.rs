//! Stage 2: pair matching across two rounds under one shared countdown.

use std::time::Duration;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use super::rules::{GameRules, CLOCK_PERIOD};
use super::scoring::{apply_mismatch_penalty, matching_time_bonus, MATCH_POINTS};
use super::timers::{Effects, TimerControl, TimerSlot};
use super::StageReport;
use crate::content::{ContentBank, MATCH_ROUNDS, PAIRS_PER_ROUND};
use crate::error::GameError;
use crate::models::content::MatchPair;
use crate::models::events::{
    CountdownTick, GameEvent, RoundStarted, StageCompleted, TimeExpired,
};

const STAGE: u8 = 2;
/// Bonus granted when the countdown runs out before both rounds are cleared.
const TIMEOUT_BONUS: u32 = 50;

#[derive(Debug, Clone)]
struct Round {
    /// Ids are renumbered 1..=PAIRS_PER_ROUND within the round.
    pairs: Vec<MatchPair>,
    right_order: Vec<u32>,
}

/// Flattens every configured pack, shuffles, and splits the first ten pairs
/// into two rounds with an independently shuffled right column each.
fn draw_rounds<R: Rng + ?Sized>(bank: &ContentBank, rng: &mut R) -> Vec<Round> {
    let mut pool: Vec<MatchPair> = bank.all_pairs().cloned().collect();
    pool.shuffle(rng);
    pool.truncate(MATCH_ROUNDS * PAIRS_PER_ROUND);

    pool.chunks(PAIRS_PER_ROUND)
        .map(|chunk| {
            let pairs: Vec<MatchPair> = chunk
                .iter()
                .zip(1u32..)
                .map(|(pair, id)| MatchPair {
                    id,
                    left: pair.left.clone(),
                    right: pair.right.clone(),
                })
                .collect();
            let mut right_order: Vec<u32> = pairs.iter().map(|p| p.id).collect();
            right_order.shuffle(rng);
            Round { pairs, right_order }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Left item highlighted, waiting for a right pick.
    Selected,
    Matched { round_complete: bool },
    Mismatched,
    /// Click had no effect (matched item, locked board, nothing selected).
    Ignored,
}

#[derive(Debug)]
pub struct MatchingStage {
    rounds: Vec<Round>,
    round: usize,
    matched: Vec<u32>,
    selected_left: Option<u32>,
    wrong_pair: Option<(u32, u32)>,
    /// Set while the completed-round feedback delay is running.
    advancing: bool,
    score: u32,
    bonus: u32,
    total_seconds: u32,
    remaining_seconds: u32,
    initial_time: u32,
    finished: bool,
    timed_out: bool,
    feedback_delay: Duration,
    result_hold: Duration,
}

impl MatchingStage {
    pub fn new<R: Rng + ?Sized>(
        bank: &ContentBank,
        rules: &GameRules,
        initial_score: u32,
        initial_time: u32,
        rng: &mut R,
    ) -> Self {
        Self {
            rounds: draw_rounds(bank, rng),
            round: 0,
            matched: Vec::new(),
            selected_left: None,
            wrong_pair: None,
            advancing: false,
            score: initial_score,
            bonus: 0,
            total_seconds: rules.matching_time_secs,
            remaining_seconds: rules.matching_time_secs,
            initial_time,
            finished: false,
            timed_out: false,
            feedback_delay: rules.match_feedback(),
            result_hold: rules.result_hold(STAGE),
        }
    }

    pub fn enter(&mut self, fx: &mut Effects) {
        fx.every(TimerSlot::RoundCountdown, CLOCK_PERIOD);
        fx.notify(GameEvent::RoundStarted(RoundStarted { round: 1 }));
    }

    /// Running game score, before the time bonus.
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn current(&self) -> &Round {
        &self.rounds[self.round]
    }

    fn check_pair(&self, pair_id: u32) -> Result<(), GameError> {
        if self.finished {
            return Err(GameError::StageOver);
        }
        if self.current().pairs.iter().any(|p| p.id == pair_id) {
            Ok(())
        } else {
            Err(GameError::UnknownPair(pair_id))
        }
    }

    fn board_locked(&self) -> bool {
        self.advancing || self.wrong_pair.is_some()
    }

    pub fn select_left(&mut self, pair_id: u32) -> Result<MatchOutcome, GameError> {
        self.check_pair(pair_id)?;
        if self.board_locked() || self.matched.contains(&pair_id) {
            return Ok(MatchOutcome::Ignored);
        }
        self.selected_left = Some(pair_id);
        Ok(MatchOutcome::Selected)
    }

    pub fn select_right(
        &mut self,
        pair_id: u32,
        fx: &mut Effects,
    ) -> Result<MatchOutcome, GameError> {
        self.check_pair(pair_id)?;
        if self.board_locked() || self.matched.contains(&pair_id) {
            return Ok(MatchOutcome::Ignored);
        }
        let Some(left) = self.selected_left else {
            return Ok(MatchOutcome::Ignored);
        };

        if left == pair_id {
            self.score += MATCH_POINTS;
            self.matched.push(pair_id);
            self.selected_left = None;

            let round_complete = self.matched.len() == self.current().pairs.len();
            if round_complete {
                self.advancing = true;
                if self.round + 1 == self.rounds.len() {
                    // freeze the countdown so the bonus reflects the finishing moment
                    fx.cancel(TimerSlot::RoundCountdown);
                }
                fx.once(TimerSlot::MatchFeedback, self.feedback_delay);
            }
            Ok(MatchOutcome::Matched { round_complete })
        } else {
            self.score = apply_mismatch_penalty(self.score);
            self.wrong_pair = Some((left, pair_id));
            fx.once(TimerSlot::MismatchClear, self.feedback_delay);
            Ok(MatchOutcome::Mismatched)
        }
    }

    pub fn on_timer(
        &mut self,
        slot: TimerSlot,
        fx: &mut Effects,
    ) -> (TimerControl, Option<StageReport>) {
        if self.finished {
            let report = (slot == TimerSlot::ResultHold).then(|| self.report());
            return (TimerControl::Stop, report);
        }

        match slot {
            TimerSlot::RoundCountdown => {
                self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
                fx.notify(GameEvent::CountdownTick(CountdownTick {
                    remaining_seconds: self.remaining_seconds,
                }));
                if self.remaining_seconds == 0 {
                    fx.notify(GameEvent::TimeExpired(TimeExpired {
                        stage: STAGE,
                        message: "Matching time is up".to_string(),
                    }));
                    self.finalize(true, fx);
                    return (TimerControl::Stop, None);
                }
                (TimerControl::Continue, None)
            }
            TimerSlot::MismatchClear => {
                self.wrong_pair = None;
                self.selected_left = None;
                fx.notify(GameEvent::SelectionCleared);
                (TimerControl::Stop, None)
            }
            TimerSlot::MatchFeedback if self.advancing => {
                self.advancing = false;
                if self.round + 1 < self.rounds.len() {
                    self.round += 1;
                    self.matched.clear();
                    fx.notify(GameEvent::RoundStarted(RoundStarted {
                        round: self.round + 1,
                    }));
                } else {
                    self.finalize(false, fx);
                }
                (TimerControl::Stop, None)
            }
            _ => (TimerControl::Stop, None),
        }
    }

    fn finalize(&mut self, timed_out: bool, fx: &mut Effects) {
        self.finished = true;
        self.timed_out = timed_out;
        self.selected_left = None;
        self.wrong_pair = None;
        self.bonus = if timed_out {
            TIMEOUT_BONUS
        } else {
            matching_time_bonus(self.remaining_seconds)
        };

        fx.cancel(TimerSlot::RoundCountdown);
        fx.cancel(TimerSlot::MismatchClear);
        fx.cancel(TimerSlot::MatchFeedback);
        fx.once(TimerSlot::ResultHold, self.result_hold);

        let report = self.report();
        fx.notify(GameEvent::StageCompleted(StageCompleted {
            stage: STAGE,
            score: report.score,
            time_seconds: report.time_seconds,
        }));
        tracing::info!(
            "Matching stage finished: score={}, bonus={}, remaining={}s, timed_out={}",
            self.score,
            self.bonus,
            self.remaining_seconds,
            timed_out
        );
    }

    /// Game totals after this stage: score plus bonus, and time including this stage.
    fn report(&self) -> StageReport {
        StageReport {
            score: self.score + self.bonus,
            time_seconds: self.initial_time + (self.total_seconds - self.remaining_seconds),
        }
    }

    pub fn view(&self) -> MatchingView {
        let round = self.current();
        MatchingView {
            round: self.round + 1,
            total_rounds: self.rounds.len(),
            title: format!("Round {} / {}", self.round + 1, self.rounds.len()),
            left: round
                .pairs
                .iter()
                .map(|p| MatchItem {
                    id: p.id,
                    text: p.left.clone(),
                })
                .collect(),
            right: round
                .right_order
                .iter()
                .filter_map(|id| round.pairs.iter().find(|p| p.id == *id))
                .map(|p| MatchItem {
                    id: p.id,
                    text: p.right.clone(),
                })
                .collect(),
            matched: self.matched.clone(),
            selected_left: self.selected_left,
            wrong_pair: self.wrong_pair,
            score: self.score,
            remaining_seconds: self.remaining_seconds,
            finished: self.finished,
            bonus: self.finished.then_some(self.bonus),
            timed_out: self.timed_out,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchItem {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MatchingView {
    pub round: usize,
    pub total_rounds: usize,
    pub title: String,
    pub left: Vec<MatchItem>,
    pub right: Vec<MatchItem>,
    pub matched: Vec<u32>,
    pub selected_left: Option<u32>,
    pub wrong_pair: Option<(u32, u32)>,
    pub score: u32,
    pub remaining_seconds: u32,
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u32>,
    pub timed_out: bool,
}
