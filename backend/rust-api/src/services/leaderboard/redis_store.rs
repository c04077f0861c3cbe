use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{LeaderboardError, LeaderboardStore};
use crate::models::leaderboard::{rank_players, LeaderboardBackend, PlayerRecord};

/// Time values at or above this no longer change the ordering inside a score.
const TIME_SPAN: u64 = 1_000_000;

/// Leaderboard kept in a Redis sorted set; each member is a JSON record.
pub struct RedisLeaderboardStore {
    redis: ConnectionManager,
    key: String,
    timeout: Duration,
}

/// Sorted-set score: higher game score first, then shorter time.
fn composite_score(record: &PlayerRecord) -> f64 {
    let time = u64::from(record.time_seconds).min(TIME_SPAN - 1);
    (u64::from(record.score) * TIME_SPAN + (TIME_SPAN - 1 - time)) as f64
}

impl RedisLeaderboardStore {
    /// Connects and checks the server with PING, both bounded by `timeout`.
    pub async fn connect(
        uri: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, LeaderboardError> {
        let client = redis::Client::open(uri)?;
        let redis = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| LeaderboardError::Timeout(timeout))??;

        let mut conn = redis.clone();
        tokio::time::timeout(timeout, redis::cmd("PING").query_async::<String>(&mut conn))
            .await
            .map_err(|_| LeaderboardError::Timeout(timeout))??;

        Ok(Self {
            redis,
            key: format!("leaderboard:{}", collection),
            timeout,
        })
    }
}

#[async_trait]
impl LeaderboardStore for RedisLeaderboardStore {
    fn backend(&self) -> LeaderboardBackend {
        LeaderboardBackend::Redis
    }

    async fn submit(&self, record: &PlayerRecord) -> Result<(), LeaderboardError> {
        let mut conn = self.redis.clone();
        let member = serde_json::to_string(record)?;

        tokio::time::timeout(
            self.timeout,
            redis::cmd("ZADD")
                .arg(&self.key)
                .arg(composite_score(record))
                .arg(member)
                .query_async::<()>(&mut conn),
        )
        .await
        .map_err(|_| LeaderboardError::Timeout(self.timeout))??;
        Ok(())
    }

    async fn query_top(&self, limit: usize) -> Result<Vec<PlayerRecord>, LeaderboardError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.redis.clone();

        let members: Vec<String> = tokio::time::timeout(
            self.timeout,
            redis::cmd("ZREVRANGE")
                .arg(&self.key)
                .arg(0)
                .arg(limit as i64 - 1)
                .query_async(&mut conn),
        )
        .await
        .map_err(|_| LeaderboardError::Timeout(self.timeout))??;

        let mut records: Vec<PlayerRecord> = members
            .iter()
            .filter_map(|member| match serde_json::from_str(member) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed leaderboard member: {}", e);
                    None
                }
            })
            .collect();
        // equal composite scores come back in reverse member order; created_at restores submission order
        rank_players(&mut records);
        Ok(records)
    }
}
