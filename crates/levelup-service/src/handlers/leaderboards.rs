//! Leaderboard handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use levelup_core::{Leaderboard, LeaderboardId, LeaderboardRanking, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::ScoreSubmission;
use crate::state::AppState;

/// Paging for a leaderboard read. Offset is applied before limit.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page size.
    pub limit: Option<usize>,
    /// Entries to skip.
    pub offset: Option<usize>,
}

/// Score submission request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    /// The scoring user.
    pub user_id: UserId,
    /// The new score.
    pub score: i64,
    /// Name shown on the board.
    pub display_name: Option<String>,
}

/// Get a ranked page. A missing board reads as empty.
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(leaderboard_id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Leaderboard>, ApiError> {
    let leaderboard_id: LeaderboardId = parse_id(&leaderboard_id)?;
    let Query(page) = query?;
    Ok(Json(state.repository().load_leaderboard(
        &leaderboard_id,
        page.limit,
        page.offset,
    )?))
}

/// Submit a score and rerank the board.
pub async fn submit_score(
    State(state): State<Arc<AppState>>,
    Path(leaderboard_id): Path<String>,
    body: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreSubmission>, ApiError> {
    let leaderboard_id: LeaderboardId = parse_id(&leaderboard_id)?;
    let Json(body) = body?;

    let _guard = state.write_guard().await;
    let submission = state.orchestrator.submit_score(
        &leaderboard_id,
        &body.user_id,
        body.score,
        body.display_name,
    )?;

    Ok(Json(submission))
}

/// Get a user's ranking.
pub async fn get_user_ranking(
    State(state): State<Arc<AppState>>,
    Path((leaderboard_id, user_id)): Path<(String, String)>,
) -> Result<Json<LeaderboardRanking>, ApiError> {
    let leaderboard_id: LeaderboardId = parse_id(&leaderboard_id)?;
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(
        state
            .repository()
            .get_user_ranking(&user_id, &leaderboard_id)?,
    ))
}
