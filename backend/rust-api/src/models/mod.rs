pub mod content;
pub mod events;
pub mod game;
pub mod leaderboard;

pub use content::{Difficulty, KeywordClue, KeywordPuzzle, MatchPack, MatchPair, Question};
pub use events::{GameEvent, LeaderboardInsert};
pub use game::GameStage;
pub use leaderboard::{LeaderboardBackend, LeaderboardResponse, PlayerRecord};
