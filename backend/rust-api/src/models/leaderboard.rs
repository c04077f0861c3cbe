use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Upper bound on entries returned from (and kept by) the leaderboard.
pub const LEADERBOARD_LIMIT: usize = 50;

/// A finished game as stored by the leaderboard. Rank is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub score: u32,
    pub time_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, score: u32, time_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            score,
            time_seconds,
            created_at: Utc::now(),
        }
    }
}

/// Higher score first, then faster time, then earlier submission.
pub fn rank_order(a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.time_seconds.cmp(&b.time_seconds))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Stable sort into leaderboard order; full ties keep their existing order.
pub fn rank_players(records: &mut [PlayerRecord]) {
    records.sort_by(rank_order);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardBackend {
    Redis,
    Local,
}

impl LeaderboardBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardBackend::Redis => "redis",
            LeaderboardBackend::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<PlayerRecord>,
    pub backend: LeaderboardBackend,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

impl LeaderboardQuery {
    /// Requested limit, or `default` when absent, clamped to `1..=LEADERBOARD_LIMIT`.
    pub fn effective_limit(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, LEADERBOARD_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, score: u32, time_seconds: u32) -> PlayerRecord {
        PlayerRecord::new(name, score, time_seconds)
    }

    #[test]
    fn ranks_by_score_then_time() {
        let mut records = vec![
            record("slow", 300, 200),
            record("low", 100, 50),
            record("fast", 300, 150),
            record("best", 420, 400),
        ];
        rank_players(&mut records);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["best", "fast", "slow", "low"]);
    }

    #[test]
    fn full_ties_keep_insertion_order() {
        let mut records = vec![record("first", 200, 90), record("second", 200, 90)];
        rank_players(&mut records);
        assert_eq!(records[0].name, "first");
        assert_eq!(records[1].name, "second");
    }

    #[test]
    fn full_ties_are_restored_to_submission_order() {
        let first = record("first", 200, 90);
        let mut second = record("second", 200, 90);
        second.created_at = first.created_at + chrono::Duration::seconds(1);

        // a store may hand ties back in any order, e.g. by member id
        let mut records = vec![second, first];
        rank_players(&mut records);
        assert_eq!(records[0].name, "first");
        assert_eq!(records[1].name, "second");
    }

    #[test]
    fn query_limit_is_clamped() {
        assert_eq!(LeaderboardQuery { limit: None }.effective_limit(50), 50);
        assert_eq!(LeaderboardQuery { limit: None }.effective_limit(20), 20);
        assert_eq!(LeaderboardQuery { limit: Some(0) }.effective_limit(50), 1);
        assert_eq!(LeaderboardQuery { limit: Some(500) }.effective_limit(50), 50);
        assert_eq!(LeaderboardQuery { limit: Some(10) }.effective_limit(50), 10);
    }
}
