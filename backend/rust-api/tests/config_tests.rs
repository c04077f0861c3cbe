use history_quiz_api::{config::Config, services::AppState};
use serial_test::serial;

const OVERRIDES: [&str; 5] = [
    "APP__GAME__FIFTY_FIFTY",
    "APP__GAME__QUESTION_TICK_MS",
    "APP__GAME__STAGE1_INTRO_MS",
    "APP__LEADERBOARD__LIMIT",
    "APP__SESSIONS__IDLE_TTL_SECS",
];

fn clear_overrides() {
    for key in OVERRIDES {
        std::env::remove_var(key);
    }
    std::env::set_var("SKIP_ROOT_ENV", "1");
}

#[test]
#[serial]
fn test_dev_profile_matches_defaults() {
    clear_overrides();
    let config = Config::load().expect("config should load");

    assert!(config.game.fifty_fifty);
    assert_eq!(config.game.stage1_intro_ms, 3_500);
    assert_eq!(config.game.question_time_ms, 15_000);
    assert_eq!(config.leaderboard_limit, 50);
    assert_eq!(config.leaderboard_collection, "vn_history_leaderboard");
}

#[test]
#[serial]
fn test_environment_overrides_game_rules() {
    clear_overrides();
    std::env::set_var("APP__GAME__FIFTY_FIFTY", "false");
    std::env::set_var("APP__GAME__STAGE1_INTRO_MS", "1000");
    std::env::set_var("APP__SESSIONS__IDLE_TTL_SECS", "120");

    let config = Config::load().expect("config should load");
    clear_overrides();

    assert!(!config.game.fifty_fifty);
    assert_eq!(config.game.stage1_intro_ms, 1_000);
    // untouched keys keep the profile values
    assert_eq!(config.game.stage2_intro_ms, 4_000);
    assert_eq!(config.session_idle_ttl_secs, 120);
}

#[test]
#[serial]
fn test_out_of_range_leaderboard_limit_uses_default() {
    clear_overrides();
    std::env::set_var("APP__LEADERBOARD__LIMIT", "500");

    let config = Config::load().expect("config should load");
    clear_overrides();

    assert_eq!(config.leaderboard_limit, 50);
}

#[test]
#[serial]
fn test_zero_question_tick_is_a_config_error() {
    clear_overrides();
    std::env::set_var("APP__GAME__QUESTION_TICK_MS", "0");

    let result = Config::load();
    clear_overrides();

    let err = result.expect_err("a zero tick must not load");
    assert!(err.to_string().contains("question_tick_ms"), "{}", err);
}

#[tokio::test]
async fn test_state_refuses_rules_timers_cannot_run() {
    let mut config = Config::default();
    config.leaderboard_dir = std::env::temp_dir().join(format!("rules-{}", uuid::Uuid::new_v4()));
    config.game.question_tick_ms = 0;

    assert!(AppState::new(config).await.is_err());
}
