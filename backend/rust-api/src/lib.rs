use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod content;
pub mod error;
pub mod extractors;
pub mod game;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1/games", games_routes())
        .nest("/api/v1/leaderboard", leaderboard_routes())
        .with_state(app_state)
        .layer(
            // outermost first
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(
                    middlewares::metrics::metrics_middleware,
                ))
                .layer(middleware::from_fn(
                    middlewares::trace::trace_context_middleware,
                ))
                .layer(CompressionLayer::new())
                .layer(middleware::from_fn(csp_middleware))
                .layer(cors),
        )
}

fn games_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::games::create_game))
        .route("/{id}", get(handlers::games::get_game))
        .route("/{id}/start", post(handlers::games::start_game))
        .route("/{id}/intro/complete", post(handlers::games::complete_intro))
        .route("/{id}/quiz/answer", post(handlers::games::answer_question))
        .route("/{id}/quiz/fifty-fifty", post(handlers::games::use_fifty_fifty))
        .route("/{id}/quiz/next", post(handlers::games::next_question))
        .route("/{id}/matching/left", post(handlers::games::select_left))
        .route("/{id}/matching/right", post(handlers::games::select_right))
        .route(
            "/{id}/keyword/clues/{index}",
            post(handlers::games::answer_clue),
        )
        .route("/{id}/keyword/guess", post(handlers::games::guess_keyword))
        .route("/{id}/restart", post(handlers::games::restart_game))
        .route("/{id}/leaderboard", post(handlers::games::open_leaderboard))
        .route(
            "/{id}/leaderboard/leave",
            post(handlers::games::leave_leaderboard),
        )
        .route("/{id}/result", get(handlers::games::get_result))
        .route("/{id}/stream", get(handlers::sse::game_stream))
}

fn leaderboard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::leaderboard::get_leaderboard))
        .route("/stream", get(handlers::sse::leaderboard_stream))
}
