//! Level handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use levelup_core::{Level, LevelProgress, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::Outcome;
use crate::state::AppState;

/// Experience request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRequest {
    /// Experience to add.
    pub amount: u64,
    /// What earned it.
    pub source: Option<String>,
}

/// Get the level record, initial if none is stored.
pub async fn get_level(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Level>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(state.repository().load_level(&user_id)?))
}

/// Add experience, awarding level-up points.
pub async fn add_experience(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<ExperienceRequest>, JsonRejection>,
) -> Result<Json<Outcome<LevelProgress>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Json(body) = body?;

    let _guard = state.write_guard().await;
    let outcome =
        state
            .orchestrator
            .add_experience(&user_id, body.amount, body.source.as_deref())?;

    Ok(Json(outcome))
}
