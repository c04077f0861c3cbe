use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::game::GameRules;
use crate::models::leaderboard::LEADERBOARD_LIMIT;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    /// Networked leaderboard; the local file store is used alone when unset.
    pub redis_uri: Option<String>,
    pub leaderboard_dir: PathBuf,
    pub leaderboard_collection: String,
    pub leaderboard_limit: usize,
    pub leaderboard_connect_timeout_ms: u64,
    /// External question bank; the bundled one is used when unset.
    pub content_path: Option<PathBuf>,
    pub session_idle_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub metrics_auth: String,
    pub game: GameRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            redis_uri: None,
            leaderboard_dir: PathBuf::from("data"),
            leaderboard_collection: "vn_history_leaderboard".to_string(),
            leaderboard_limit: LEADERBOARD_LIMIT,
            leaderboard_connect_timeout_ms: 2_000,
            content_path: None,
            session_idle_ttl_secs: 3_600,
            session_sweep_interval_secs: 60,
            metrics_auth: "admin:changeme".to_string(),
            game: GameRules::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env || dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .ok()
            .filter(|uri| !uri.trim().is_empty());

        let leaderboard_dir = settings
            .get_string("leaderboard.local_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.leaderboard_dir);

        let leaderboard_collection = settings
            .get_string("leaderboard.collection")
            .unwrap_or(defaults.leaderboard_collection);

        let leaderboard_limit = settings
            .get_int("leaderboard.limit")
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| (1..=LEADERBOARD_LIMIT).contains(v))
            .unwrap_or(defaults.leaderboard_limit);

        let leaderboard_connect_timeout_ms = settings
            .get_int("leaderboard.connect_timeout_ms")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(defaults.leaderboard_connect_timeout_ms);

        let content_path = settings
            .get_string("content.path")
            .or_else(|_| env::var("CONTENT_PATH"))
            .ok()
            .map(PathBuf::from);

        let session_idle_ttl_secs = settings
            .get_int("sessions.idle_ttl_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.session_idle_ttl_secs);

        let session_sweep_interval_secs = settings
            .get_int("sessions.sweep_interval_secs")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.session_sweep_interval_secs);

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or_else(|_| {
                if app_env == "prod" {
                    eprintln!("WARNING: METRICS_AUTH not set, using default credentials in production!");
                }
                defaults.metrics_auth
            });

        let game = match settings.get::<GameRules>("game") {
            Ok(rules) => rules,
            Err(config::ConfigError::NotFound(_)) => GameRules::default(),
            Err(e) => return Err(e),
        };
        game.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(Config {
            bind_addr,
            redis_uri,
            leaderboard_dir,
            leaderboard_collection,
            leaderboard_limit,
            leaderboard_connect_timeout_ms,
            content_path,
            session_idle_ttl_secs,
            session_sweep_interval_secs,
            metrics_auth,
            game,
        })
    }
}
