use axum::http::StatusCode;
use history_quiz_api::{
    models::leaderboard::{LeaderboardBackend, PlayerRecord},
    services::AppState,
};
use serde_json::Value;
use std::sync::Arc;

mod common;

fn names(body: &Value) -> Vec<String> {
    body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_leaderboard_is_ranked_by_score_then_time() {
    let app = common::create_test_app().await;
    for (name, score, time) in [
        ("Lê Lợi", 300, 400),
        ("Ngô Quyền", 420, 500),
        ("Quang Trung", 300, 250),
        ("Trần Quốc Toản", 120, 90),
    ] {
        let outcome = app
            .state
            .leaderboard
            .submit(PlayerRecord::new(name, score, time))
            .await;
        assert!(outcome.stored);
        assert_eq!(outcome.backend, LeaderboardBackend::Local);
    }

    let (status, body) = app.get("/api/v1/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "local");
    assert_eq!(
        names(&body),
        ["Ngô Quyền", "Quang Trung", "Lê Lợi", "Trần Quốc Toản"]
    );
}

#[tokio::test]
async fn test_limit_query_is_clamped() {
    let app = common::create_test_app().await;
    for i in 0..60u32 {
        app.state
            .leaderboard
            .submit(PlayerRecord::new(format!("player-{}", i), i, 100))
            .await;
    }

    let (_, body) = app.get("/api/v1/leaderboard?limit=3").await;
    assert_eq!(names(&body), ["player-59", "player-58", "player-57"]);

    let (_, body) = app.get("/api/v1/leaderboard?limit=500").await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 50);

    let (_, body) = app.get("/api/v1/leaderboard?limit=0").await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_local_board_survives_restart() {
    let dir = common::scratch_dir("persist");

    let first = AppState::new(common::test_config(dir.clone())).await.unwrap();
    first
        .leaderboard
        .submit(PlayerRecord::new("Hai Bà Trưng", 275, 310))
        .await;
    drop(first);

    let second = Arc::new(AppState::new(common::test_config(dir)).await.unwrap());
    let board = second.leaderboard.top(10).await;
    assert_eq!(board.entries.len(), 1);
    assert_eq!(board.entries[0].name, "Hai Bà Trưng");
    assert_eq!(board.entries[0].score, 275);
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_local_store() {
    let app = common::create_test_app_with(|config| {
        // nothing listens on port 1
        config.redis_uri = Some("redis://127.0.0.1:1/".to_string());
        config.leaderboard_connect_timeout_ms = 300;
    })
    .await;

    assert_eq!(app.state.leaderboard.backend(), LeaderboardBackend::Local);

    let outcome = app
        .state
        .leaderboard
        .submit(PlayerRecord::new("Lý Công Uẩn", 180, 200))
        .await;
    assert!(outcome.stored);
    assert!(app
        .leaderboard_dir
        .join("vn_history_leaderboard.json")
        .exists());

    let (_, health) = app.get("/health").await;
    assert_eq!(health["dependencies"]["leaderboard"]["redis"], "unavailable");
}

#[tokio::test]
async fn test_inserts_are_broadcast() {
    let app = common::create_test_app().await;
    let mut inserts = app.state.leaderboard.subscribe();

    app.state
        .leaderboard
        .submit(PlayerRecord::new("Đinh Bộ Lĩnh", 90, 45))
        .await;

    let insert = inserts.recv().await.unwrap();
    assert_eq!(insert.record.name, "Đinh Bộ Lĩnh");
    assert_eq!(insert.record.score, 90);
}
