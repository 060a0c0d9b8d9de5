//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    achievements, health, leaderboards, levels, points, progress, rewards, snapshot, streaks,
};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Achievements
/// - `GET /v1/users/:user_id/achievements` - List achievements
/// - `POST /v1/users/:user_id/achievements` - Register achievements from definitions
/// - `GET /v1/users/:user_id/achievements/:achievement_id` - Get one achievement
/// - `POST /v1/users/:user_id/achievements/:achievement_id/progress` - Set progress
/// - `POST /v1/users/:user_id/achievements/:achievement_id/unlock` - Unlock
///
/// ## Points
/// - `GET /v1/users/:user_id/points` - Derived balance
/// - `GET /v1/users/:user_id/points/transactions` - Ledger, newest first
/// - `POST /v1/users/:user_id/points/add` - Add points
/// - `POST /v1/users/:user_id/points/deduct` - Deduct points
///
/// ## Levels and streaks
/// - `GET /v1/users/:user_id/level` - Level record
/// - `POST /v1/users/:user_id/level/experience` - Add experience
/// - `GET /v1/users/:user_id/streaks` - List streaks
/// - `GET /v1/users/:user_id/streaks/:streak_type` - Get one streak
/// - `POST /v1/users/:user_id/streaks/:streak_type/activity` - Record activity
///
/// ## Rewards and progress
/// - `GET /v1/users/:user_id/rewards` - List rewards
/// - `POST /v1/users/:user_id/rewards` - Offer a reward
/// - `GET /v1/users/:user_id/rewards/:reward_id` - Get one reward
/// - `POST /v1/users/:user_id/rewards/:reward_id/unlock` - Make a reward available
/// - `POST /v1/users/:user_id/rewards/:reward_id/claim` - Claim a reward
/// - `GET /v1/users/:user_id/progress` - List progress records
/// - `POST /v1/users/:user_id/progress/update` - Increment a metric
/// - `GET /v1/users/:user_id/snapshot` - Everything for one user
///
/// ## Leaderboards
/// - `GET /v1/leaderboards/:leaderboard_id` - Ranked page
/// - `POST /v1/leaderboards/:leaderboard_id/scores` - Submit a score
/// - `GET /v1/leaderboards/:leaderboard_id/users/:user_id` - A user's ranking
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let user_routes = Router::new()
        // Achievements
        .route(
            "/achievements",
            get(achievements::list_achievements).post(achievements::register_achievements),
        )
        .route(
            "/achievements/:achievement_id",
            get(achievements::get_achievement),
        )
        .route(
            "/achievements/:achievement_id/progress",
            post(achievements::update_progress),
        )
        .route(
            "/achievements/:achievement_id/unlock",
            post(achievements::unlock_achievement),
        )
        // Points
        .route("/points", get(points::get_balance))
        .route("/points/transactions", get(points::list_transactions))
        .route("/points/add", post(points::add_points))
        .route("/points/deduct", post(points::deduct_points))
        // Levels
        .route("/level", get(levels::get_level))
        .route("/level/experience", post(levels::add_experience))
        // Streaks
        .route("/streaks", get(streaks::list_streaks))
        .route("/streaks/:streak_type", get(streaks::get_streak))
        .route(
            "/streaks/:streak_type/activity",
            post(streaks::record_activity),
        )
        // Rewards
        .route(
            "/rewards",
            get(rewards::list_rewards).post(rewards::offer_reward),
        )
        .route("/rewards/:reward_id", get(rewards::get_reward))
        .route("/rewards/:reward_id/unlock", post(rewards::unlock_reward))
        .route("/rewards/:reward_id/claim", post(rewards::claim_reward))
        // Progress
        .route("/progress", get(progress::list_progress))
        .route("/progress/update", post(progress::update_progress))
        // Snapshot
        .route("/snapshot", get(snapshot::get_snapshot));

    let api_routes = Router::new()
        .nest("/users/:user_id", user_routes)
        .route(
            "/leaderboards/:leaderboard_id",
            get(leaderboards::get_leaderboard),
        )
        .route(
            "/leaderboards/:leaderboard_id/scores",
            post(leaderboards::submit_score),
        )
        .route(
            "/leaderboards/:leaderboard_id/users/:user_id",
            get(leaderboards::get_user_ranking),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
