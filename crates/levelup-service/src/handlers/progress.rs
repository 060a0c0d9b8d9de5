//! Progress handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use levelup_core::{Period, Progress, ProgressUpdate, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::Outcome;
use crate::state::AppState;

/// Filter for progress reads.
#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    /// Only this metric.
    pub metric: Option<String>,
}

/// Metric increment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Metric identifier.
    pub metric: String,
    /// Amount to add.
    pub increment: f64,
    /// Category for a new record.
    pub category: Option<String>,
    /// Period for a new record.
    pub period: Option<Period>,
    /// Target to set or replace.
    pub target_value: Option<f64>,
    /// Free-form host application data for a new record.
    pub metadata: Option<serde_json::Value>,
}

/// List progress records.
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<Json<Vec<Progress>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Query(query) = query?;
    Ok(Json(
        state
            .repository()
            .load_progress(&user_id, query.metric.as_deref())?,
    ))
}

/// Increment a metric, creating its record on first use.
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Outcome<Progress>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Json(body) = body?;
    if body.metric.trim().is_empty() {
        return Err(ApiError::BadRequest("metric must not be empty".into()));
    }

    let update = ProgressUpdate {
        user_id,
        metric: body.metric,
        increment: body.increment,
        category: body.category,
        period: body.period,
        target_value: body.target_value,
        metadata: body.metadata,
    };

    let _guard = state.write_guard().await;
    let outcome = state.orchestrator.update_progress(update)?;

    Ok(Json(outcome))
}
