//! Point handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use levelup_core::{GamificationError, PointBalance, PointGrant, PointTransaction, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::{GamificationEvent, Outcome};
use crate::state::AppState;

/// Query parameters for the ledger.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    /// Keep at most this many entries, newest first.
    pub limit: Option<usize>,
}

/// Get the derived point balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PointBalance>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(state.repository().load_point_balance(&user_id)?))
}

/// List ledger entries, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> Result<Json<Vec<PointTransaction>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Query(query) = query?;
    Ok(Json(
        state
            .repository()
            .load_point_transactions(&user_id, query.limit)?,
    ))
}

/// Add points.
pub async fn add_points(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<PointGrant>, JsonRejection>,
) -> Result<Json<Outcome<PointTransaction>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Json(grant) = body?;
    ensure_positive(&grant)?;

    let _guard = state.write_guard().await;
    let transaction = state.repository().add_points(&user_id, grant)?;
    let events = vec![GamificationEvent::from_transaction(&transaction)];

    Ok(Json(Outcome::new(transaction, events)))
}

/// Deduct points. The balance may go negative.
pub async fn deduct_points(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<PointGrant>, JsonRejection>,
) -> Result<Json<Outcome<PointTransaction>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Json(grant) = body?;
    ensure_positive(&grant)?;

    let _guard = state.write_guard().await;
    let transaction = state.repository().deduct_points(&user_id, grant)?;
    let events = vec![GamificationEvent::from_transaction(&transaction)];

    Ok(Json(Outcome::new(transaction, events)))
}

fn ensure_positive(grant: &PointGrant) -> Result<(), ApiError> {
    if grant.amount <= 0 {
        return Err(GamificationError::InvalidData(format!(
            "amount must be positive, got {}",
            grant.amount
        ))
        .into());
    }
    Ok(())
}
