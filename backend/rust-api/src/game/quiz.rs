//! Stage 1: ten timed multiple-choice questions.
//!
//! Each question runs its own 15 second countdown in fixed ticks; a separate
//! one-second clock accumulates total elapsed time until the stage finishes.

use std::time::Duration;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use super::rules::{GameRules, CLOCK_PERIOD};
use super::scoring::{quiz_correct_award, QuizAward};
use super::timers::{Effects, TimerControl, TimerSlot};
use super::StageReport;
use crate::content::{ContentBank, QUIZ_DRAW};
use crate::error::GameError;
use crate::models::content::{Difficulty, Question};
use crate::models::events::{ClockTick, GameEvent, QuestionTick, StageCompleted, TimeExpired};

const STAGE: u8 = 1;
const LIFELINE_HIDES: usize = 2;

/// Draws the quiz set: each difficulty pool is shuffled on its own and the
/// configured number taken from it, easy questions first.
pub fn draw_questions<R: Rng + ?Sized>(bank: &ContentBank, rng: &mut R) -> Vec<Question> {
    let mut drawn = Vec::new();
    for (difficulty, count) in QUIZ_DRAW {
        let mut pool: Vec<Question> = bank.questions_of(difficulty).cloned().collect();
        pool.shuffle(rng);
        pool.truncate(count);
        drawn.extend(pool);
    }
    drawn
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Wrong,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifelineState {
    Disabled,
    Available,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unanswered,
    Answered {
        outcome: AnswerOutcome,
        selected: Option<usize>,
        award: Option<QuizAward>,
    },
}

#[derive(Debug)]
pub struct QuizStage {
    questions: Vec<Question>,
    index: usize,
    score: u32,
    streak: u32,
    remaining_ms: u64,
    phase: Phase,
    hidden: Vec<usize>,
    lifeline: LifelineState,
    elapsed_seconds: u32,
    finished: bool,
    question_time_ms: u64,
    tick: Duration,
    result_hold: Duration,
}

impl QuizStage {
    pub fn new(questions: Vec<Question>, rules: &GameRules) -> Self {
        Self {
            questions,
            index: 0,
            score: 0,
            streak: 0,
            remaining_ms: rules.question_time_ms,
            phase: Phase::Unanswered,
            hidden: Vec::new(),
            lifeline: if rules.fifty_fifty {
                LifelineState::Available
            } else {
                LifelineState::Disabled
            },
            elapsed_seconds: 0,
            finished: false,
            question_time_ms: rules.question_time_ms,
            tick: rules.question_tick(),
            result_hold: rules.result_hold(STAGE),
        }
    }

    pub fn enter(&mut self, fx: &mut Effects) {
        fx.every(TimerSlot::QuestionCountdown, self.tick);
        fx.every(TimerSlot::StageClock, CLOCK_PERIOD);
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.index]
    }

    pub fn answer(&mut self, option: usize, fx: &mut Effects) -> Result<AnswerOutcome, GameError> {
        if self.finished {
            return Err(GameError::StageOver);
        }
        if self.phase != Phase::Unanswered {
            return Err(GameError::AlreadyAnswered);
        }
        let question = &self.questions[self.index];
        if option >= question.options.len() || self.hidden.contains(&option) {
            return Err(GameError::InvalidOption(option));
        }

        fx.cancel(TimerSlot::QuestionCountdown);

        let (outcome, award) = if option == question.correct_option {
            let award = quiz_correct_award(self.remaining_ms, self.streak);
            self.score += award.total;
            self.streak += 1;
            (AnswerOutcome::Correct, Some(award))
        } else {
            self.streak = 0;
            (AnswerOutcome::Wrong, None)
        };

        tracing::debug!(
            "Quiz answer: question={}, outcome={:?}, remaining_ms={}, score={}",
            question.id,
            outcome,
            self.remaining_ms,
            self.score
        );

        self.phase = Phase::Answered {
            outcome,
            selected: Some(option),
            award,
        };
        Ok(outcome)
    }

    /// Hides two incorrect options of the current question. Once per game.
    pub fn use_fifty_fifty<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<usize>, GameError> {
        match self.lifeline {
            LifelineState::Disabled => return Err(GameError::LifelineDisabled),
            LifelineState::Used => return Err(GameError::LifelineUsed),
            LifelineState::Available => {}
        }
        if self.finished {
            return Err(GameError::StageOver);
        }
        if self.phase != Phase::Unanswered {
            return Err(GameError::AlreadyAnswered);
        }

        let question = &self.questions[self.index];
        let mut wrong: Vec<usize> = (0..question.options.len())
            .filter(|idx| *idx != question.correct_option)
            .collect();
        wrong.shuffle(rng);
        wrong.truncate(LIFELINE_HIDES);
        wrong.sort_unstable();

        self.hidden = wrong.clone();
        self.lifeline = LifelineState::Used;
        Ok(wrong)
    }

    /// Moves past an answered question, or finishes the stage after the last one.
    pub fn next(&mut self, fx: &mut Effects) -> Result<(), GameError> {
        if self.finished {
            return Err(GameError::StageOver);
        }
        if self.phase == Phase::Unanswered {
            return Err(GameError::NotAnswered);
        }

        if self.index + 1 < self.questions.len() {
            self.index += 1;
            self.phase = Phase::Unanswered;
            self.hidden.clear();
            self.remaining_ms = self.question_time_ms;
            fx.every(TimerSlot::QuestionCountdown, self.tick);
        } else {
            self.finished = true;
            fx.cancel(TimerSlot::QuestionCountdown);
            fx.cancel(TimerSlot::StageClock);
            fx.once(TimerSlot::ResultHold, self.result_hold);
            fx.notify(GameEvent::StageCompleted(StageCompleted {
                stage: STAGE,
                score: self.score,
                time_seconds: self.elapsed_seconds,
            }));
            tracing::info!(
                "Quiz stage finished: score={}, elapsed={}s",
                self.score,
                self.elapsed_seconds
            );
        }
        Ok(())
    }

    pub fn on_timer(
        &mut self,
        slot: TimerSlot,
        fx: &mut Effects,
    ) -> (TimerControl, Option<StageReport>) {
        match slot {
            TimerSlot::QuestionCountdown => (self.tick_question(fx), None),
            TimerSlot::StageClock => {
                if self.finished {
                    return (TimerControl::Stop, None);
                }
                self.elapsed_seconds += 1;
                fx.notify(GameEvent::ClockTick(ClockTick {
                    elapsed_seconds: self.elapsed_seconds,
                }));
                (TimerControl::Continue, None)
            }
            TimerSlot::ResultHold if self.finished => (
                TimerControl::Stop,
                Some(StageReport {
                    score: self.score,
                    time_seconds: self.elapsed_seconds,
                }),
            ),
            _ => (TimerControl::Stop, None),
        }
    }

    fn tick_question(&mut self, fx: &mut Effects) -> TimerControl {
        if self.finished || self.phase != Phase::Unanswered {
            return TimerControl::Stop;
        }

        self.remaining_ms = self.remaining_ms.saturating_sub(self.tick.as_millis() as u64);
        if self.remaining_ms == 0 {
            self.streak = 0;
            self.phase = Phase::Answered {
                outcome: AnswerOutcome::Timeout,
                selected: None,
                award: None,
            };
            fx.notify(GameEvent::TimeExpired(TimeExpired {
                stage: STAGE,
                message: "Question time is up".to_string(),
            }));
            return TimerControl::Stop;
        }

        if self.remaining_ms % 1_000 == 0 {
            fx.notify(GameEvent::QuestionTick(QuestionTick {
                question_number: self.index + 1,
                remaining_ms: self.remaining_ms,
            }));
        }
        TimerControl::Continue
    }

    pub fn view(&self) -> QuizView {
        let question = &self.questions[self.index];
        let feedback = match self.phase {
            Phase::Unanswered => None,
            Phase::Answered {
                outcome,
                selected,
                award,
            } => Some(AnswerFeedback {
                outcome,
                selected_option: selected,
                correct_option: question.correct_option,
                explanation: question.explanation.clone(),
                award,
            }),
        };

        QuizView {
            question_number: self.index + 1,
            total_questions: self.questions.len(),
            question: QuestionView {
                id: question.id,
                text: question.text.clone(),
                difficulty: question.difficulty,
                options: question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(index, text)| OptionView {
                        index,
                        text: text.clone(),
                        hidden: self.hidden.contains(&index),
                    })
                    .collect(),
            },
            remaining_ms: self.remaining_ms,
            streak: self.streak,
            score: self.score,
            elapsed_seconds: self.elapsed_seconds,
            lifeline: self.lifeline,
            finished: self.finished,
            feedback,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizView {
    pub question_number: usize,
    pub total_questions: usize,
    pub question: QuestionView,
    pub remaining_ms: u64,
    pub streak: u32,
    pub score: u32,
    pub elapsed_seconds: u32,
    pub lifeline: LifelineState,
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<AnswerFeedback>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: u32,
    pub text: String,
    pub difficulty: Difficulty,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Serialize)]
pub struct OptionView {
    pub index: usize,
    pub text: String,
    pub hidden: bool,
}

/// Revealed only once the current question is settled.
#[derive(Debug, Serialize)]
pub struct AnswerFeedback {
    pub outcome: AnswerOutcome,
    pub selected_option: Option<usize>,
    pub correct_option: usize,
    pub explanation: Option<String>,
    pub award: Option<QuizAward>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn stage_with(rules: &GameRules) -> QuizStage {
        let bank = ContentBank::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        QuizStage::new(draw_questions(&bank, &mut rng), rules)
    }

    fn stage() -> QuizStage {
        stage_with(&GameRules::default())
    }

    fn correct(stage: &QuizStage) -> usize {
        stage.current_question().correct_option
    }

    fn wrong(stage: &QuizStage) -> usize {
        (correct(stage) + 1) % 4
    }

    fn tick(stage: &mut QuizStage, times: usize) {
        for _ in 0..times {
            let mut fx = Effects::new();
            stage.on_timer(TimerSlot::QuestionCountdown, &mut fx);
        }
    }

    #[test]
    fn draw_takes_four_three_three_in_order() {
        let bank = ContentBank::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let drawn = draw_questions(&bank, &mut rng);

        let difficulties: Vec<_> = drawn.iter().map(|q| q.difficulty).collect();
        assert_eq!(&difficulties[..4], &[Difficulty::Easy; 4]);
        assert_eq!(&difficulties[4..7], &[Difficulty::Medium; 3]);
        assert_eq!(&difficulties[7..], &[Difficulty::Hard; 3]);

        let mut ids: Vec<_> = drawn.iter().map(|q| q.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn enter_starts_countdown_and_clock() {
        let mut quiz = stage();
        let mut fx = Effects::new();
        quiz.enter(&mut fx);
        assert_eq!(
            fx.started(),
            vec![TimerSlot::QuestionCountdown, TimerSlot::StageClock]
        );
    }

    #[test]
    fn instant_correct_answer_earns_top_tier() {
        let mut quiz = stage();
        let mut fx = Effects::new();
        let outcome = quiz.answer(correct(&quiz), &mut fx).unwrap();

        assert_eq!(outcome, AnswerOutcome::Correct);
        assert_eq!(quiz.score(), 40);
        assert_eq!(quiz.streak(), 1);
        assert!(fx.cancels(TimerSlot::QuestionCountdown));
    }

    #[test]
    fn answer_at_exactly_ten_seconds_is_second_tier() {
        let mut quiz = stage();
        tick(&mut quiz, 50);
        assert_eq!(quiz.view().remaining_ms, 10_000);

        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        assert_eq!(quiz.score(), 30);
    }

    #[test]
    fn answer_just_above_ten_seconds_is_top_tier() {
        let mut quiz = stage();
        tick(&mut quiz, 49);
        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        assert_eq!(quiz.score(), 40);
    }

    #[test]
    fn answer_at_five_seconds_is_lowest_tier() {
        let mut quiz = stage();
        tick(&mut quiz, 99);
        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        assert_eq!(quiz.score(), 30);

        quiz.next(&mut Effects::new()).unwrap();
        tick(&mut quiz, 100);
        assert_eq!(quiz.view().remaining_ms, 5_000);
        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        // 10 base + 10 tier + 5 streak
        assert_eq!(quiz.score(), 30 + 25);
    }

    #[test]
    fn wrong_answer_resets_streak_without_penalty() {
        let mut quiz = stage();
        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        quiz.next(&mut Effects::new()).unwrap();
        quiz.answer(wrong(&quiz), &mut Effects::new()).unwrap();

        assert_eq!(quiz.score(), 40);
        assert_eq!(quiz.streak(), 0);
    }

    #[test]
    fn countdown_expiry_is_a_timeout() {
        let mut quiz = stage();
        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        quiz.next(&mut Effects::new()).unwrap();

        tick(&mut quiz, 149);
        assert!(quiz.view().feedback.is_none());

        let mut fx = Effects::new();
        let (control, _) = quiz.on_timer(TimerSlot::QuestionCountdown, &mut fx);
        assert_eq!(control, TimerControl::Stop);

        let view = quiz.view();
        let feedback = view.feedback.expect("timeout feedback");
        assert_eq!(feedback.outcome, AnswerOutcome::Timeout);
        assert_eq!(quiz.streak(), 0);
        assert_eq!(quiz.score(), 40);
        assert_eq!(
            quiz.answer(correct(&quiz), &mut Effects::new()),
            Err(GameError::AlreadyAnswered)
        );
    }

    #[test]
    fn countdown_stops_once_answered() {
        let mut quiz = stage();
        quiz.answer(wrong(&quiz), &mut Effects::new()).unwrap();
        let (control, _) = quiz.on_timer(TimerSlot::QuestionCountdown, &mut Effects::new());
        assert_eq!(control, TimerControl::Stop);
        assert_eq!(quiz.view().remaining_ms, 15_000);
    }

    #[test]
    fn next_requires_an_answer() {
        let mut quiz = stage();
        assert_eq!(quiz.next(&mut Effects::new()), Err(GameError::NotAnswered));
    }

    #[test]
    fn fifty_fifty_hides_two_wrong_options_once() {
        let mut quiz = stage();
        let mut rng = StdRng::seed_from_u64(3);
        let hidden = quiz.use_fifty_fifty(&mut rng).unwrap();

        assert_eq!(hidden.len(), 2);
        assert!(!hidden.contains(&correct(&quiz)));
        assert_eq!(
            quiz.answer(hidden[0], &mut Effects::new()),
            Err(GameError::InvalidOption(hidden[0]))
        );
        assert_eq!(quiz.use_fifty_fifty(&mut rng), Err(GameError::LifelineUsed));

        quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
        quiz.next(&mut Effects::new()).unwrap();
        assert!(quiz.view().question.options.iter().all(|o| !o.hidden));
        assert_eq!(quiz.view().lifeline, LifelineState::Used);
    }

    #[test]
    fn fifty_fifty_not_allowed_after_answering() {
        let mut quiz = stage();
        quiz.answer(wrong(&quiz), &mut Effects::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            quiz.use_fifty_fifty(&mut rng),
            Err(GameError::AlreadyAnswered)
        );
        assert_eq!(quiz.view().lifeline, LifelineState::Available);
    }

    #[test]
    fn fifty_fifty_respects_feature_flag() {
        let rules = GameRules {
            fifty_fifty: false,
            ..GameRules::default()
        };
        let mut quiz = stage_with(&rules);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            quiz.use_fifty_fifty(&mut rng),
            Err(GameError::LifelineDisabled)
        );
    }

    #[test]
    fn full_run_reports_score_and_elapsed_time() {
        let mut quiz = stage();
        quiz.enter(&mut Effects::new());

        // correct, correct, wrong, then correct for the rest, all answered instantly
        let mut expected = 0;
        let mut streak = 0;
        for n in 0..10 {
            quiz.on_timer(TimerSlot::StageClock, &mut Effects::new());
            if n == 2 {
                quiz.answer(wrong(&quiz), &mut Effects::new()).unwrap();
                streak = 0;
            } else {
                quiz.answer(correct(&quiz), &mut Effects::new()).unwrap();
                expected += 10 + 30 + streak * 5;
                streak += 1;
            }
            let mut fx = Effects::new();
            quiz.next(&mut fx).unwrap();
            if n == 9 {
                assert_eq!(fx.started(), vec![TimerSlot::ResultHold]);
                assert!(fx.cancels(TimerSlot::StageClock));
            }
        }

        assert!(quiz.is_finished());
        assert_eq!(quiz.score(), expected);

        // the clock no longer advances once finished
        let (control, _) = quiz.on_timer(TimerSlot::StageClock, &mut Effects::new());
        assert_eq!(control, TimerControl::Stop);

        let (_, report) = quiz.on_timer(TimerSlot::ResultHold, &mut Effects::new());
        assert_eq!(
            report,
            Some(StageReport {
                score: expected,
                time_seconds: 10
            })
        );
    }
}
