use std::sync::Arc;

use rand::rngs::StdRng;
use serde::Serialize;
use uuid::Uuid;

use super::keyword::{ClueOutcome, KeywordOutcome, KeywordStage, KeywordView};
use super::matching::{MatchOutcome, MatchingStage, MatchingView};
use super::quiz::{draw_questions, AnswerOutcome, QuizStage, QuizView};
use super::rules::GameRules;
use super::scoring::HIGH_SCORE_THRESHOLD;
use super::timers::{Effects, TimerControl, TimerSlot};
use crate::content::ContentBank;
use crate::error::GameError;
use crate::models::events::{GameEvent, StageChanged};
use crate::models::game::GameStage;
use crate::models::leaderboard::PlayerRecord;

#[derive(Debug)]
enum ActiveStage {
    Idle,
    Quiz(QuizStage),
    Matching(MatchingStage),
    Keyword(KeywordStage),
}

/// One player's run through the three stages.
///
/// Every stage boundary bumps `epoch` and cancels all timers, so a timer that
/// fires late carries an outdated epoch and is dropped by [`GameSession::on_timer`].
#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    stage: GameStage,
    player_name: String,
    score: u32,
    time_seconds: u32,
    epoch: u64,
    active: ActiveStage,
    submitted: Option<PlayerRecord>,
    bank: Arc<ContentBank>,
    rules: Arc<GameRules>,
    rng: StdRng,
}

impl GameSession {
    pub fn new(id: Uuid, bank: Arc<ContentBank>, rules: Arc<GameRules>, rng: StdRng) -> Self {
        Self {
            id,
            stage: GameStage::Welcome,
            player_name: String::new(),
            score: 0,
            time_seconds: 0,
            epoch: 0,
            active: ActiveStage::Idle,
            submitted: None,
            bank,
            rules,
            rng,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> GameStage {
        self.stage
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_seconds(&self) -> u32 {
        self.time_seconds
    }

    /// The record handed to the leaderboard when this game finished.
    pub fn submitted_record(&self) -> Option<&PlayerRecord> {
        self.submitted.as_ref()
    }

    fn transition_error(&self, action: &'static str) -> GameError {
        GameError::InvalidTransition {
            stage: self.stage,
            action,
        }
    }

    fn enter_stage(&mut self, stage: GameStage, fx: &mut Effects) {
        self.epoch += 1;
        fx.cancel_all();

        tracing::info!(
            "Game {} stage change: {} -> {} (score={}, time={}s)",
            self.id,
            self.stage,
            stage,
            self.score,
            self.time_seconds
        );
        self.stage = stage;

        match stage {
            GameStage::Stage1Intro | GameStage::Stage2Intro | GameStage::Stage3Intro => {
                self.active = ActiveStage::Idle;
                let number = intro_number(stage);
                if let Some(delay) = self.rules.intro_delay(number) {
                    fx.once(TimerSlot::IntroAdvance, delay);
                }
            }
            GameStage::Playing1 => {
                let questions = draw_questions(&self.bank, &mut self.rng);
                let mut quiz = QuizStage::new(questions, &self.rules);
                quiz.enter(fx);
                self.active = ActiveStage::Quiz(quiz);
            }
            GameStage::Playing2 => {
                let mut matching = MatchingStage::new(
                    &self.bank,
                    &self.rules,
                    self.score,
                    self.time_seconds,
                    &mut self.rng,
                );
                matching.enter(fx);
                self.active = ActiveStage::Matching(matching);
            }
            GameStage::Playing3 => {
                let mut keyword = KeywordStage::new(
                    self.bank.keyword().clone(),
                    &self.rules,
                    self.score,
                    self.time_seconds,
                );
                keyword.enter(fx);
                self.active = ActiveStage::Keyword(keyword);
            }
            GameStage::Welcome | GameStage::Finished | GameStage::Leaderboard => {
                self.active = ActiveStage::Idle;
            }
        }

        fx.notify(GameEvent::StageChanged(StageChanged {
            stage,
            score: self.score,
            time_seconds: self.time_seconds,
        }));
    }

    pub fn start(&mut self, player_name: &str, fx: &mut Effects) -> Result<(), GameError> {
        if self.stage != GameStage::Welcome {
            return Err(self.transition_error("start a game"));
        }
        let name = player_name.trim();
        if name.is_empty() {
            return Err(GameError::InvalidPlayerName);
        }
        self.player_name = name.to_string();
        self.enter_stage(GameStage::Stage1Intro, fx);
        Ok(())
    }

    /// Confirms intro screen `stage` (1..=3) and starts that stage.
    pub fn complete_intro(&mut self, stage: u8, fx: &mut Effects) -> Result<(), GameError> {
        match (GameStage::intro(stage), GameStage::playing(stage)) {
            (Some(intro), Some(playing)) if intro == self.stage => {
                self.enter_stage(playing, fx);
                Ok(())
            }
            _ => Err(self.transition_error("complete this intro")),
        }
    }

    /// Records the absolute totals reported by stage `stage` and moves on.
    pub fn complete_stage(
        &mut self,
        stage: u8,
        score: u32,
        time_seconds: u32,
        fx: &mut Effects,
    ) -> Result<(), GameError> {
        if GameStage::playing(stage) != Some(self.stage) {
            return Err(self.transition_error("complete a stage"));
        }
        self.score = score;
        self.time_seconds = time_seconds;

        match GameStage::intro(stage + 1) {
            Some(next_intro) => self.enter_stage(next_intro, fx),
            None => self.finish(fx),
        }
        Ok(())
    }

    fn finish(&mut self, fx: &mut Effects) {
        self.enter_stage(GameStage::Finished, fx);
        if self.submitted.is_none() {
            let record = PlayerRecord::new(self.player_name.clone(), self.score, self.time_seconds);
            fx.submit(record.clone());
            self.submitted = Some(record);
        }
    }

    /// Back to an empty welcome screen from anywhere.
    pub fn restart(&mut self, fx: &mut Effects) {
        self.player_name.clear();
        self.score = 0;
        self.time_seconds = 0;
        self.submitted = None;
        self.enter_stage(GameStage::Welcome, fx);
    }

    pub fn view_leaderboard(&mut self, fx: &mut Effects) -> Result<(), GameError> {
        match self.stage {
            GameStage::Welcome | GameStage::Finished => {
                self.enter_stage(GameStage::Leaderboard, fx);
                Ok(())
            }
            _ => Err(self.transition_error("open the leaderboard")),
        }
    }

    pub fn leave_leaderboard(&mut self, fx: &mut Effects) -> Result<(), GameError> {
        if self.stage != GameStage::Leaderboard {
            return Err(self.transition_error("leave the leaderboard"));
        }
        self.restart(fx);
        Ok(())
    }

    fn quiz(&mut self, action: &'static str) -> Result<&mut QuizStage, GameError> {
        match &mut self.active {
            ActiveStage::Quiz(quiz) => Ok(quiz),
            _ => Err(GameError::InvalidTransition {
                stage: self.stage,
                action,
            }),
        }
    }

    fn matching(&mut self, action: &'static str) -> Result<&mut MatchingStage, GameError> {
        match &mut self.active {
            ActiveStage::Matching(matching) => Ok(matching),
            _ => Err(GameError::InvalidTransition {
                stage: self.stage,
                action,
            }),
        }
    }

    fn keyword(&mut self, action: &'static str) -> Result<&mut KeywordStage, GameError> {
        match &mut self.active {
            ActiveStage::Keyword(keyword) => Ok(keyword),
            _ => Err(GameError::InvalidTransition {
                stage: self.stage,
                action,
            }),
        }
    }

    pub fn answer_question(
        &mut self,
        option: usize,
        fx: &mut Effects,
    ) -> Result<AnswerOutcome, GameError> {
        self.quiz("answer a question")?.answer(option, fx)
    }

    pub fn use_fifty_fifty(&mut self) -> Result<Vec<usize>, GameError> {
        match &mut self.active {
            ActiveStage::Quiz(quiz) => quiz.use_fifty_fifty(&mut self.rng),
            _ => Err(GameError::InvalidTransition {
                stage: self.stage,
                action: "use the 50/50 lifeline",
            }),
        }
    }

    pub fn next_question(&mut self, fx: &mut Effects) -> Result<(), GameError> {
        self.quiz("move to the next question")?.next(fx)
    }

    pub fn select_left(&mut self, pair_id: u32) -> Result<MatchOutcome, GameError> {
        self.matching("select a pair")?.select_left(pair_id)
    }

    pub fn select_right(
        &mut self,
        pair_id: u32,
        fx: &mut Effects,
    ) -> Result<MatchOutcome, GameError> {
        self.matching("select a pair")?.select_right(pair_id, fx)
    }

    pub fn answer_clue(&mut self, index: usize, answer: &str) -> Result<ClueOutcome, GameError> {
        self.keyword("answer a clue")?.answer_clue(index, answer)
    }

    pub fn guess_keyword(
        &mut self,
        guess: &str,
        fx: &mut Effects,
    ) -> Result<KeywordOutcome, GameError> {
        self.keyword("guess the keyword")?.guess_keyword(guess, fx)
    }

    /// Handles a timer started in `epoch`. Timers from an earlier stage are ignored.
    pub fn on_timer(&mut self, slot: TimerSlot, epoch: u64, fx: &mut Effects) -> TimerControl {
        if epoch != self.epoch {
            tracing::debug!(
                "Game {} dropped stale {} timer (epoch {} != {})",
                self.id,
                slot.as_str(),
                epoch,
                self.epoch
            );
            return TimerControl::Stop;
        }

        if matches!(self.active, ActiveStage::Idle) {
            let stage = intro_number(self.stage);
            let auto_advances = self.rules.intro_delay(stage).is_some();
            if slot == TimerSlot::IntroAdvance && auto_advances {
                if let Err(err) = self.complete_intro(stage, fx) {
                    tracing::warn!("Game {} intro timer rejected: {}", self.id, err);
                }
            }
            return TimerControl::Stop;
        }

        let (control, report) = match &mut self.active {
            ActiveStage::Quiz(quiz) => quiz.on_timer(slot, fx),
            ActiveStage::Matching(matching) => matching.on_timer(slot, fx),
            ActiveStage::Keyword(keyword) => keyword.on_timer(slot, fx),
            ActiveStage::Idle => return TimerControl::Stop,
        };

        if let Some(report) = report {
            let stage = playing_number(self.stage);
            if let Err(err) = self.complete_stage(stage, report.score, report.time_seconds, fx) {
                tracing::warn!("Game {} stage report rejected: {}", self.id, err);
            }
            return TimerControl::Stop;
        }
        control
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let (quiz, matching, keyword) = match &self.active {
            ActiveStage::Quiz(stage) => (Some(stage.view()), None, None),
            ActiveStage::Matching(stage) => (None, Some(stage.view()), None),
            ActiveStage::Keyword(stage) => (None, None, Some(stage.view())),
            ActiveStage::Idle => (None, None, None),
        };
        let result = (self.stage == GameStage::Finished).then(|| ResultSummary {
            score: self.score,
            time_seconds: self.time_seconds,
            high_score: self.score >= HIGH_SCORE_THRESHOLD,
        });

        GameSnapshot {
            id: self.id,
            stage: self.stage,
            player_name: self.player_name.clone(),
            score: self.score,
            time_seconds: self.time_seconds,
            quiz,
            matching,
            keyword,
            result,
        }
    }
}

fn intro_number(stage: GameStage) -> u8 {
    match stage {
        GameStage::Stage1Intro => 1,
        GameStage::Stage2Intro => 2,
        GameStage::Stage3Intro => 3,
        _ => 0,
    }
}

fn playing_number(stage: GameStage) -> u8 {
    match stage {
        GameStage::Playing1 => 1,
        GameStage::Playing2 => 2,
        GameStage::Playing3 => 3,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResultSummary {
    pub score: u32,
    pub time_seconds: u32,
    pub high_score: bool,
}

/// Everything a client needs to render the current screen.
#[derive(Debug, Serialize)]
pub struct GameSnapshot {
    pub id: Uuid,
    pub stage: GameStage,
    pub player_name: String,
    pub score: u32,
    pub time_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<KeywordView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSummary>,
}
