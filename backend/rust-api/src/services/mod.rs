use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::Config;
use crate::content::ContentBank;

pub mod game_service;
pub mod leaderboard;

use game_service::GameService;
use leaderboard::LeaderboardService;

pub struct AppState {
    pub config: Config,
    pub games: Arc<GameService>,
    pub leaderboard: Arc<LeaderboardService>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.game.validate()?;
        let bank = ContentBank::load(config.content_path.as_deref())
            .context("Failed to load content bank")?;
        tracing::info!(
            "Content bank loaded: {} questions, {} matching packs",
            bank.questions().len(),
            bank.match_packs().len()
        );

        let leaderboard = Arc::new(LeaderboardService::from_config(&config).await);
        tracing::info!("Leaderboard backend: {}", leaderboard.backend().as_str());

        Ok(Self::with_parts(config, Arc::new(bank), leaderboard))
    }

    /// Assembles state from already-built parts.
    pub fn with_parts(
        config: Config,
        bank: Arc<ContentBank>,
        leaderboard: Arc<LeaderboardService>,
    ) -> Self {
        let games = Arc::new(GameService::new(
            bank,
            Arc::new(config.game.clone()),
            leaderboard.clone(),
            Duration::from_secs(config.session_idle_ttl_secs),
        ));

        Self {
            config,
            games,
            leaderboard,
        }
    }
}
