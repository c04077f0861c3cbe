use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LeaderboardError, LeaderboardStore};
use crate::models::leaderboard::{rank_players, LeaderboardBackend, PlayerRecord, LEADERBOARD_LIMIT};

/// Leaderboard kept in a JSON file named after the collection.
///
/// The file always holds at most [`LEADERBOARD_LIMIT`] records in rank order.
pub struct LocalLeaderboardStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl LocalLeaderboardStore {
    pub fn new(dir: &Path, collection: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", collection)),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<PlayerRecord>, LeaderboardError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Vec<PlayerRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    "Local leaderboard {} is corrupt ({}), starting a fresh board",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn write_all(&self, records: &[PlayerRecord]) -> Result<(), LeaderboardError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LeaderboardStore for LocalLeaderboardStore {
    fn backend(&self) -> LeaderboardBackend {
        LeaderboardBackend::Local
    }

    async fn submit(&self, record: &PlayerRecord) -> Result<(), LeaderboardError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;
        records.push(record.clone());
        rank_players(&mut records);
        records.truncate(LEADERBOARD_LIMIT);
        self.write_all(&records).await
    }

    async fn query_top(&self, limit: usize) -> Result<Vec<PlayerRecord>, LeaderboardError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;
        rank_players(&mut records);
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> LocalLeaderboardStore {
        let dir = std::env::temp_dir().join(format!("{}-{}", name, uuid::Uuid::new_v4()));
        LocalLeaderboardStore::new(&dir, "vn_history_leaderboard")
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_board() {
        let store = store("lb-missing");
        assert!(store.query_top(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn orders_by_score_then_time() {
        let store = store("lb-order");
        store.submit(&PlayerRecord::new("slow", 300, 400)).await.unwrap();
        store.submit(&PlayerRecord::new("low", 100, 50)).await.unwrap();
        store.submit(&PlayerRecord::new("fast", 300, 250)).await.unwrap();

        let names: Vec<String> = store
            .query_top(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["fast", "slow", "low"]);
    }

    #[tokio::test]
    async fn keeps_only_the_best_fifty() {
        let store = store("lb-cap");
        for score in 0..60 {
            store
                .submit(&PlayerRecord::new(format!("p{}", score), score, 100))
                .await
                .unwrap();
        }

        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        let on_disk: Vec<PlayerRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk.len(), LEADERBOARD_LIMIT);
        assert_eq!(on_disk[0].score, 59);
        assert_eq!(on_disk.last().unwrap().score, 10);
    }

    #[tokio::test]
    async fn survives_reopening() {
        let dir = std::env::temp_dir().join(format!("lb-reopen-{}", uuid::Uuid::new_v4()));
        LocalLeaderboardStore::new(&dir, "board")
            .submit(&PlayerRecord::new("Lan", 210, 300))
            .await
            .unwrap();

        let reopened = LocalLeaderboardStore::new(&dir, "board");
        let top = reopened.query_top(50).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Lan");
    }

    #[tokio::test]
    async fn corrupt_file_is_replaced() {
        let store = store("lb-corrupt");
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        assert!(store.query_top(10).await.unwrap().is_empty());
        store.submit(&PlayerRecord::new("Lan", 10, 10)).await.unwrap();
        assert_eq!(store.query_top(10).await.unwrap().len(), 1);
    }
}
