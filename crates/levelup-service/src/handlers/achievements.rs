//! Achievement handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use levelup_core::{Achievement, AchievementDefinition, AchievementId, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::Outcome;
use crate::state::AppState;

/// One achievement to register for a user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementSeed {
    /// Identifier, unique per user.
    pub id: AchievementId,
    /// Template fields.
    #[serde(flatten)]
    pub definition: AchievementDefinition,
}

/// Progress update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    /// New absolute progress.
    pub progress: u32,
}

/// List a user's achievements.
pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Achievement>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(state.repository().load_achievements(&user_id)?))
}

/// Register achievements from definitions.
///
/// Seeds whose id is already registered are skipped, so existing progress is kept.
/// Returns the full collection.
pub async fn register_achievements(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<Vec<AchievementSeed>>, JsonRejection>,
) -> Result<Json<Vec<Achievement>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Json(seeds) = body?;

    let _guard = state.write_guard().await;
    let repository = state.repository();
    let mut achievements = repository.load_achievements(&user_id)?;
    let now = Utc::now();

    let mut added = 0usize;
    for seed in seeds {
        if achievements.iter().any(|a| a.id == seed.id) {
            continue;
        }
        achievements.push(Achievement::from_definition(
            seed.id,
            user_id.clone(),
            &seed.definition,
            now,
        ));
        added += 1;
    }

    if added > 0 {
        repository.save_achievements(&achievements)?;
    }

    tracing::info!(user_id = %user_id, added, "Achievements registered");

    Ok(Json(achievements))
}

/// Get one achievement.
pub async fn get_achievement(
    State(state): State<Arc<AppState>>,
    Path((user_id, achievement_id)): Path<(String, String)>,
) -> Result<Json<Achievement>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let achievement_id: AchievementId = parse_id(&achievement_id)?;
    Ok(Json(
        state
            .repository()
            .get_achievement(&user_id, &achievement_id)?,
    ))
}

/// Set progress, unlocking and awarding points once the requirement is reached.
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, achievement_id)): Path<(String, String)>,
    body: Result<Json<ProgressRequest>, JsonRejection>,
) -> Result<Json<Outcome<Achievement>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let achievement_id: AchievementId = parse_id(&achievement_id)?;
    let Json(body) = body?;

    let _guard = state.write_guard().await;
    let outcome =
        state
            .orchestrator
            .record_achievement_progress(&user_id, &achievement_id, body.progress)?;

    Ok(Json(outcome))
}

/// Unlock an achievement and award its points.
pub async fn unlock_achievement(
    State(state): State<Arc<AppState>>,
    Path((user_id, achievement_id)): Path<(String, String)>,
) -> Result<Json<Outcome<Achievement>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let achievement_id: AchievementId = parse_id(&achievement_id)?;

    let _guard = state.write_guard().await;
    let outcome = state
        .orchestrator
        .unlock_achievement(&user_id, &achievement_id)?;

    Ok(Json(outcome))
}
