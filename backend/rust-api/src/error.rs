use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::game::GameStage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Player name is required")]
    InvalidPlayerName,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Game {0} not found")]
    GameNotFound(Uuid),
    #[error("Cannot {action} during {stage}")]
    InvalidTransition {
        stage: GameStage,
        action: &'static str,
    },
    #[error("Option {0} is not available")]
    InvalidOption(usize),
    #[error("Question already answered")]
    AlreadyAnswered,
    #[error("Current question has not been answered yet")]
    NotAnswered,
    #[error("50/50 lifeline is disabled")]
    LifelineDisabled,
    #[error("50/50 lifeline already used")]
    LifelineUsed,
    #[error("Unknown pair {0}")]
    UnknownPair(u32),
    #[error("Unknown clue {0}")]
    UnknownClue(usize),
    #[error("Clue {0} is already unlocked")]
    ClueAlreadyUnlocked(usize),
    #[error("Stage is already over")]
    StageOver,
}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::InvalidPlayerName
            | GameError::Validation(_)
            | GameError::InvalidOption(_)
            | GameError::UnknownPair(_)
            | GameError::UnknownClue(_) => StatusCode::BAD_REQUEST,
            GameError::GameNotFound(_) => StatusCode::NOT_FOUND,
            GameError::InvalidTransition { .. }
            | GameError::AlreadyAnswered
            | GameError::NotAnswered
            | GameError::LifelineDisabled
            | GameError::LifelineUsed
            | GameError::ClueAlreadyUnlocked(_)
            | GameError::StageOver => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_client_error() {
            tracing::debug!("Rejected game action: {}", self);
        }
        let body = json!({
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            GameError::InvalidPlayerName.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GameError::GameNotFound(Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GameError::InvalidTransition {
                stage: GameStage::Welcome,
                action: "answer a question",
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn transition_message_names_stage() {
        let err = GameError::InvalidTransition {
            stage: GameStage::Playing2,
            action: "restart the intro",
        };
        assert_eq!(err.to_string(), "Cannot restart the intro during playing2");
    }
}
