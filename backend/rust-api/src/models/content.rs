use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Multiple-choice question used by the timed quiz stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_option: usize,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPair {
    pub id: u32,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPack {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub pairs: Vec<MatchPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordClue {
    pub id: u32,
    pub question: String,
    /// Accepted answers, compared after normalization
    pub answers: Vec<String>,
    pub hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPuzzle {
    pub keyword: String,
    pub description: String,
    pub clues: Vec<KeywordClue>,
}
