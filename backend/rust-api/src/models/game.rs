use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Screens of a game, in play order. `Leaderboard` is a side branch of
/// `Welcome` and `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStage {
    Welcome,
    Stage1Intro,
    Playing1,
    Stage2Intro,
    Playing2,
    Stage3Intro,
    Playing3,
    Finished,
    Leaderboard,
}

impl GameStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStage::Welcome => "welcome",
            GameStage::Stage1Intro => "stage1_intro",
            GameStage::Playing1 => "playing1",
            GameStage::Stage2Intro => "stage2_intro",
            GameStage::Playing2 => "playing2",
            GameStage::Stage3Intro => "stage3_intro",
            GameStage::Playing3 => "playing3",
            GameStage::Finished => "finished",
            GameStage::Leaderboard => "leaderboard",
        }
    }

    pub fn intro(stage: u8) -> Option<Self> {
        match stage {
            1 => Some(GameStage::Stage1Intro),
            2 => Some(GameStage::Stage2Intro),
            3 => Some(GameStage::Stage3Intro),
            _ => None,
        }
    }

    pub fn playing(stage: u8) -> Option<Self> {
        match stage {
            1 => Some(GameStage::Playing1),
            2 => Some(GameStage::Playing2),
            3 => Some(GameStage::Playing3),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Player name is required".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartGameRequest {
    #[validate(
        length(max = 40, message = "Player name must be at most 40 characters"),
        custom(function = "not_blank")
    )]
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteIntroRequest {
    pub stage: u8,
}

#[derive(Debug, Deserialize)]
pub struct QuizAnswerRequest {
    pub option: usize,
}

#[derive(Debug, Deserialize)]
pub struct PairSelectionRequest {
    pub pair_id: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClueAnswerRequest {
    #[validate(length(max = 200, message = "Answer must be at most 200 characters"))]
    pub answer: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct KeywordGuessRequest {
    #[validate(length(max = 200, message = "Guess must be at most 200 characters"))]
    pub guess: String,
}
