//! Static question, matching and keyword content.
//!
//! The bank is validated once at startup: a game must always be able to draw
//! its full question set, both matching rounds and all four keyword clues, so a
//! short pool is reported as a [`ContentError`] instead of degrading mid-game.

use std::path::Path;

use thiserror::Error;

use crate::models::content::{Difficulty, KeywordPuzzle, MatchPack, MatchPair, Question};

const BUILTIN_BANK: &str = include_str!("../content/bank.json");

/// Questions drawn per difficulty for the quiz stage, in play order.
pub const QUIZ_DRAW: [(Difficulty, usize); 3] = [
    (Difficulty::Easy, 4),
    (Difficulty::Medium, 3),
    (Difficulty::Hard, 3),
];

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const MATCH_ROUNDS: usize = 2;
pub const PAIRS_PER_ROUND: usize = 5;
pub const KEYWORD_CLUES: usize = 4;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse content bank: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{difficulty} pool has {available} questions, {required} required")]
    InsufficientPool {
        difficulty: &'static str,
        required: usize,
        available: usize,
    },
    #[error("question {id} is malformed: {reason}")]
    InvalidQuestion { id: u32, reason: String },
    #[error("matching packs hold {available} pairs, {required} required")]
    InsufficientPairs { required: usize, available: usize },
    #[error("keyword puzzle is malformed: {0}")]
    InvalidKeyword(String),
}

#[derive(Debug, serde::Deserialize)]
struct RawBank {
    questions: Vec<Question>,
    match_packs: Vec<MatchPack>,
    keyword: KeywordPuzzle,
}

#[derive(Debug, Clone)]
pub struct ContentBank {
    questions: Vec<Question>,
    match_packs: Vec<MatchPack>,
    keyword: KeywordPuzzle,
}

impl ContentBank {
    /// Bank bundled with the binary.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json(BUILTIN_BANK)
    }

    /// Loads the bank from `path`, or the bundled one when no path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self, ContentError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                tracing::info!("Loading content bank from {}", path.display());
                Self::from_json(&raw)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ContentError> {
        let raw: RawBank = serde_json::from_str(raw)?;
        let bank = Self {
            questions: raw.questions,
            match_packs: raw.match_packs,
            keyword: raw.keyword,
        };
        bank.validate()?;
        Ok(bank)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn questions_of(&self, difficulty: Difficulty) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(move |q| q.difficulty == difficulty)
    }

    pub fn match_packs(&self) -> &[MatchPack] {
        &self.match_packs
    }

    /// Every configured pair across all packs.
    pub fn all_pairs(&self) -> impl Iterator<Item = &MatchPair> {
        self.match_packs.iter().flat_map(|pack| pack.pairs.iter())
    }

    pub fn keyword(&self) -> &KeywordPuzzle {
        &self.keyword
    }

    fn validate(&self) -> Result<(), ContentError> {
        for question in &self.questions {
            if question.options.len() != OPTIONS_PER_QUESTION {
                return Err(ContentError::InvalidQuestion {
                    id: question.id,
                    reason: format!(
                        "expected {} options, found {}",
                        OPTIONS_PER_QUESTION,
                        question.options.len()
                    ),
                });
            }
            if question.correct_option >= question.options.len() {
                return Err(ContentError::InvalidQuestion {
                    id: question.id,
                    reason: format!("correct option {} out of range", question.correct_option),
                });
            }
        }

        for (difficulty, required) in QUIZ_DRAW {
            let available = self.questions_of(difficulty).count();
            if available < required {
                return Err(ContentError::InsufficientPool {
                    difficulty: difficulty.as_str(),
                    required,
                    available,
                });
            }
        }

        let required = MATCH_ROUNDS * PAIRS_PER_ROUND;
        let available = self.all_pairs().count();
        if available < required {
            return Err(ContentError::InsufficientPairs {
                required,
                available,
            });
        }

        if self.keyword.keyword.trim().is_empty() {
            return Err(ContentError::InvalidKeyword("keyword is empty".into()));
        }
        if self.keyword.clues.len() != KEYWORD_CLUES {
            return Err(ContentError::InvalidKeyword(format!(
                "expected {} clues, found {}",
                KEYWORD_CLUES,
                self.keyword.clues.len()
            )));
        }
        if let Some(clue) = self.keyword.clues.iter().find(|c| c.answers.is_empty()) {
            return Err(ContentError::InvalidKeyword(format!(
                "clue {} has no accepted answers",
                clue.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bank_is_valid() {
        let bank = ContentBank::builtin().expect("bundled bank must validate");
        assert_eq!(bank.questions().len(), 30);
        assert_eq!(bank.all_pairs().count(), 20);
        assert_eq!(bank.keyword().clues.len(), KEYWORD_CLUES);
    }

    #[test]
    fn short_hard_pool_is_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(BUILTIN_BANK).unwrap();
        let questions = value["questions"].as_array_mut().unwrap();
        questions.retain(|q| q["difficulty"] != "hard");

        let err = ContentBank::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ContentError::InsufficientPool {
                difficulty: "hard",
                required: 3,
                available: 0
            }
        ));
    }

    #[test]
    fn out_of_range_correct_option_is_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(BUILTIN_BANK).unwrap();
        value["questions"][0]["correct_option"] = serde_json::json!(7);

        let err = ContentBank::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, ContentError::InvalidQuestion { id: 1, .. }));
    }

    #[test]
    fn missing_pairs_are_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(BUILTIN_BANK).unwrap();
        value["match_packs"].as_array_mut().unwrap().truncate(1);

        let err = ContentBank::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ContentError::InsufficientPairs {
                required: 10,
                available: 5
            }
        ));
    }
}
