//! Streak handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use levelup_core::{GamificationError, Streak, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::Outcome;
use crate::state::AppState;

/// Activity request. The activity date defaults to now.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    /// When the activity happened.
    pub activity_date: Option<DateTime<Utc>>,
}

/// List a user's streaks.
pub async fn list_streaks(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Streak>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(state.repository().load_streaks(&user_id)?))
}

/// Get one streak by type.
pub async fn get_streak(
    State(state): State<Arc<AppState>>,
    Path((user_id, streak_type)): Path<(String, String)>,
) -> Result<Json<Streak>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(
        state
            .repository()
            .load_streak_by_type(&user_id, &streak_type)?,
    ))
}

/// Record activity for a streak type, starting the streak on first use.
pub async fn record_activity(
    State(state): State<Arc<AppState>>,
    Path((user_id, streak_type)): Path<(String, String)>,
    body: Option<Json<ActivityRequest>>,
) -> Result<Json<Outcome<Streak>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    if streak_type.trim().is_empty() {
        return Err(GamificationError::InvalidData("streak type must not be empty".into()).into());
    }
    let activity_date = body
        .and_then(|Json(body)| body.activity_date)
        .unwrap_or_else(Utc::now);

    let _guard = state.write_guard().await;
    let outcome =
        state
            .orchestrator
            .record_streak_activity(&user_id, &streak_type, activity_date)?;

    Ok(Json(outcome))
}
