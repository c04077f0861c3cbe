#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use history_quiz_api::{config::Config, create_router, services::AppState};

pub const METRICS_AUTH: &str = "admin:test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub leaderboard_dir: PathBuf,
}

/// Scratch directory that is unique per call.
pub fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("history-quiz-{}-{}", name, uuid::Uuid::new_v4()))
}

pub fn test_config(leaderboard_dir: PathBuf) -> Config {
    Config {
        leaderboard_dir,
        metrics_auth: METRICS_AUTH.to_string(),
        ..Config::default()
    }
}

/// App backed by the bundled content and a local leaderboard in a fresh
/// temp directory. Redis is never configured here.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

pub async fn create_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let leaderboard_dir = scratch_dir("lb");
    let mut config = test_config(leaderboard_dir.clone());
    customize(&mut config);

    let state = Arc::new(
        AppState::new(config)
            .await
            .expect("Failed to initialize test app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        leaderboard_dir,
    }
}

impl TestApp {
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.request("POST", uri, None).await
    }

    /// Creates a game and returns its id.
    pub async fn create_game(&self) -> String {
        let (status, body) = self.post_empty("/api/v1/games").await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a game, names the player and confirms the first intro.
    pub async fn game_in_quiz(&self, player: &str) -> String {
        let id = self.create_game().await;
        let (status, _) = self
            .post(
                &format!("/api/v1/games/{}/start", id),
                serde_json::json!({ "player_name": player }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self
            .post(
                &format!("/api/v1/games/{}/intro/complete", id),
                serde_json::json!({ "stage": 1 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "playing1");
        id
    }
}

pub fn basic_auth(credentials: &str) -> String {
    format!("Basic {}", general_purpose::STANDARD.encode(credentials))
}
