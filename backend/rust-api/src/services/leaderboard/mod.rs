//! Ranked store for finished games.
//!
//! A networked store (Redis) is selected once at startup by a capability
//! check. Every call that fails on it is retried exactly once against the
//! local file store, so a player always gets a result screen.

mod local_store;
mod redis_store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub use local_store::LocalLeaderboardStore;
pub use redis_store::RedisLeaderboardStore;

use crate::config::Config;
use crate::metrics::{record_leaderboard_write, track_store_operation};
use crate::models::events::LeaderboardInsert;
use crate::models::leaderboard::{
    rank_players, LeaderboardBackend, LeaderboardResponse, PlayerRecord,
};

const INSERT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("leaderboard store timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    fn backend(&self) -> LeaderboardBackend;

    async fn submit(&self, record: &PlayerRecord) -> Result<(), LeaderboardError>;

    /// Up to `limit` records, best first.
    async fn query_top(&self, limit: usize) -> Result<Vec<PlayerRecord>, LeaderboardError>;
}

/// Where a submitted result ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub backend: LeaderboardBackend,
    pub stored: bool,
}

pub struct LeaderboardService {
    primary: Option<Arc<dyn LeaderboardStore>>,
    local: Arc<dyn LeaderboardStore>,
    default_limit: usize,
    inserts: broadcast::Sender<LeaderboardInsert>,
    /// Set once a submit missed the primary and landed in the local store.
    local_fallbacks: AtomicBool,
}

impl LeaderboardService {
    pub fn new(
        primary: Option<Arc<dyn LeaderboardStore>>,
        local: Arc<dyn LeaderboardStore>,
        default_limit: usize,
    ) -> Self {
        let (inserts, _) = broadcast::channel(INSERT_CHANNEL_CAPACITY);
        Self {
            primary,
            local,
            default_limit,
            inserts,
            local_fallbacks: AtomicBool::new(false),
        }
    }

    /// Picks the networked store when Redis is configured and answers PING in time.
    pub async fn from_config(config: &Config) -> Self {
        let local: Arc<dyn LeaderboardStore> = Arc::new(LocalLeaderboardStore::new(
            &config.leaderboard_dir,
            &config.leaderboard_collection,
        ));

        let primary = match config.redis_uri.as_deref() {
            Some(uri) => {
                let timeout = Duration::from_millis(config.leaderboard_connect_timeout_ms);
                tracing::info!("Attempting to connect to Redis leaderboard...");
                match RedisLeaderboardStore::connect(uri, &config.leaderboard_collection, timeout)
                    .await
                {
                    Ok(store) => {
                        tracing::info!("Redis leaderboard available");
                        Some(Arc::new(store) as Arc<dyn LeaderboardStore>)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Redis leaderboard unavailable ({}), using local store at {}",
                            e,
                            config.leaderboard_dir.display()
                        );
                        None
                    }
                }
            }
            None => {
                tracing::info!(
                    "No Redis configured, using local leaderboard at {}",
                    config.leaderboard_dir.display()
                );
                None
            }
        };

        Self::new(primary, local, config.leaderboard_limit)
    }

    /// Backend that serves requests while it keeps working.
    pub fn backend(&self) -> LeaderboardBackend {
        self.primary
            .as_ref()
            .map(|store| store.backend())
            .unwrap_or_else(|| self.local.backend())
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeaderboardInsert> {
        self.inserts.subscribe()
    }

    /// Stores a finished game. Never fails towards the caller.
    pub async fn submit(&self, record: PlayerRecord) -> SubmitOutcome {
        if let Some(primary) = &self.primary {
            let backend = primary.backend();
            match track_store_operation("submit", backend.as_str(), primary.submit(&record)).await
            {
                Ok(()) => {
                    record_leaderboard_write(backend.as_str(), true);
                    return self.stored(record, backend);
                }
                Err(e) => {
                    record_leaderboard_write(backend.as_str(), false);
                    tracing::warn!(
                        "Leaderboard submit to {} failed ({}), falling back to local store",
                        backend.as_str(),
                        e
                    );
                }
            }
        }

        let backend = self.local.backend();
        match track_store_operation("submit", backend.as_str(), self.local.submit(&record)).await {
            Ok(()) => {
                record_leaderboard_write(backend.as_str(), true);
                if self.primary.is_some() {
                    self.local_fallbacks.store(true, Ordering::SeqCst);
                }
                self.stored(record, backend)
            }
            Err(e) => {
                record_leaderboard_write(backend.as_str(), false);
                tracing::error!(
                    "Failed to store result for {} in local leaderboard: {}",
                    record.name,
                    e
                );
                SubmitOutcome {
                    backend,
                    stored: false,
                }
            }
        }
    }

    fn stored(&self, record: PlayerRecord, backend: LeaderboardBackend) -> SubmitOutcome {
        tracing::info!(
            "Leaderboard entry stored in {}: {} score={} time={}s",
            backend.as_str(),
            record.name,
            record.score,
            record.time_seconds
        );
        // No subscribers is fine
        let _ = self.inserts.send(LeaderboardInsert { record });
        SubmitOutcome {
            backend,
            stored: true,
        }
    }

    /// Top `limit` entries; an unreadable board is reported as empty.
    ///
    /// Once a submit has fallen back to the local store, the primary's board
    /// is merged with the local entries so those results stay visible.
    pub async fn top(&self, limit: usize) -> LeaderboardResponse {
        if let Some(primary) = &self.primary {
            let backend = primary.backend();
            match track_store_operation("query_top", backend.as_str(), primary.query_top(limit))
                .await
            {
                Ok(mut entries) => {
                    if self.local_fallbacks.load(Ordering::SeqCst) {
                        let missing: Vec<_> = self
                            .local_top(limit)
                            .await
                            .into_iter()
                            .filter(|record| entries.iter().all(|e| e.id != record.id))
                            .collect();
                        entries.extend(missing);
                        rank_players(&mut entries);
                        entries.truncate(limit);
                    }
                    return LeaderboardResponse { entries, backend };
                }
                Err(e) => tracing::warn!(
                    "Leaderboard query on {} failed ({}), falling back to local store",
                    backend.as_str(),
                    e
                ),
            }
        }

        LeaderboardResponse {
            entries: self.local_top(limit).await,
            backend: self.local.backend(),
        }
    }

    async fn local_top(&self, limit: usize) -> Vec<PlayerRecord> {
        let backend = self.local.backend();
        match track_store_operation("query_top", backend.as_str(), self.local.query_top(limit))
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to read local leaderboard: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LeaderboardStore for BrokenStore {
        fn backend(&self) -> LeaderboardBackend {
            LeaderboardBackend::Redis
        }

        async fn submit(&self, _record: &PlayerRecord) -> Result<(), LeaderboardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LeaderboardError::Timeout(Duration::from_millis(5)))
        }

        async fn query_top(&self, _limit: usize) -> Result<Vec<PlayerRecord>, LeaderboardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LeaderboardError::Timeout(Duration::from_millis(5)))
        }
    }

    /// Rejects writes but still answers reads with its own board.
    struct ReadOnlyStore {
        board: Vec<PlayerRecord>,
    }

    #[async_trait]
    impl LeaderboardStore for ReadOnlyStore {
        fn backend(&self) -> LeaderboardBackend {
            LeaderboardBackend::Redis
        }

        async fn submit(&self, _record: &PlayerRecord) -> Result<(), LeaderboardError> {
            Err(LeaderboardError::Timeout(Duration::from_millis(5)))
        }

        async fn query_top(&self, limit: usize) -> Result<Vec<PlayerRecord>, LeaderboardError> {
            Ok(self.board.iter().take(limit).cloned().collect())
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn failing_primary_falls_back_once_per_call() {
        let dir = temp_dir("lb-fallback");
        let broken = Arc::new(BrokenStore {
            calls: AtomicUsize::new(0),
        });
        let service = LeaderboardService::new(
            Some(broken.clone() as Arc<dyn LeaderboardStore>),
            Arc::new(LocalLeaderboardStore::new(&dir, "board")),
            50,
        );
        let mut inserts = service.subscribe();

        let outcome = service.submit(PlayerRecord::new("Lan", 300, 200)).await;
        assert_eq!(
            outcome,
            SubmitOutcome {
                backend: LeaderboardBackend::Local,
                stored: true
            }
        );
        assert_eq!(inserts.recv().await.unwrap().record.name, "Lan");

        let board = service.top(10).await;
        assert_eq!(board.backend, LeaderboardBackend::Local);
        assert_eq!(board.entries.len(), 1);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fallen_back_results_show_up_next_to_primary_board() {
        let dir = temp_dir("lb-readonly");
        let leader = PlayerRecord::new("Mai", 400, 300);
        let trailing = PlayerRecord::new("Tuấn", 100, 90);
        let service = LeaderboardService::new(
            Some(Arc::new(ReadOnlyStore {
                board: vec![leader, trailing],
            }) as Arc<dyn LeaderboardStore>),
            Arc::new(LocalLeaderboardStore::new(&dir, "board")),
            50,
        );

        let record = PlayerRecord::new("Lan", 300, 200);
        let outcome = service.submit(record.clone()).await;
        assert_eq!(outcome.backend, LeaderboardBackend::Local);
        assert!(outcome.stored);

        let board = service.top(10).await;
        assert_eq!(board.backend, LeaderboardBackend::Redis);
        let names: Vec<_> = board.entries.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Mai", "Lan", "Tuấn"]);
        assert_eq!(board.entries[1].id, record.id);

        let top_two = service.top(2).await;
        assert_eq!(top_two.entries.len(), 2);
        assert_eq!(top_two.entries[1].name, "Lan");
    }

    #[tokio::test]
    async fn unwritable_local_store_reports_not_stored() {
        let dir = temp_dir("lb-unwritable");
        // a regular file where the directory should be
        let blocked = dir.join("not-a-dir");
        std::fs::write(&blocked, b"x").unwrap();

        let service = LeaderboardService::new(
            None,
            Arc::new(LocalLeaderboardStore::new(&blocked, "board")),
            50,
        );
        let outcome = service.submit(PlayerRecord::new("Lan", 1, 1)).await;
        assert!(!outcome.stored);
        assert_eq!(outcome.backend, LeaderboardBackend::Local);
        assert!(service.top(5).await.entries.is_empty());
    }
}
