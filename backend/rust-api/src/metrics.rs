use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Game Metrics
    pub static ref GAMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "games_total",
        "Total number of games by lifecycle event",
        &["status"]
    )
    .unwrap();

    pub static ref GAMES_ACTIVE: IntGauge = register_int_gauge!(
        "games_active",
        "Number of games currently held in memory"
    )
    .unwrap();

    pub static ref STAGE_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stage_actions_total",
        "Player actions per stage and outcome",
        &["stage", "outcome"]
    )
    .unwrap();

    // Leaderboard Metrics
    pub static ref LEADERBOARD_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "leaderboard_writes_total",
        "Leaderboard writes per backend",
        &["backend", "status"]
    )
    .unwrap();

    pub static ref LEADERBOARD_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "leaderboard_operation_duration_seconds",
        "Leaderboard store operation duration in seconds",
        &["operation", "backend"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: time a leaderboard store call
pub async fn track_store_operation<F, T, E>(operation: &str, backend: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;

    LEADERBOARD_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, backend])
        .observe(start.elapsed().as_secs_f64());

    result
}

pub fn record_leaderboard_write(backend: &str, ok: bool) {
    let status = if ok { "success" } else { "error" };
    LEADERBOARD_WRITES_TOTAL
        .with_label_values(&[backend, status])
        .inc();
}

pub fn record_stage_action(stage: &str, outcome: &str) {
    STAGE_ACTIONS_TOTAL
        .with_label_values(&[stage, outcome])
        .inc();
}
