//! Reward handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use levelup_core::{GamificationError, Reward, RewardClaim, RewardDefinition, RewardId, UserId};

use super::parse_id;
use crate::error::ApiError;
use crate::orchestrator::Outcome;
use crate::state::AppState;

/// Reward offer request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    /// Identifier, unique per user.
    pub id: RewardId,
    /// Make the reward available right away.
    #[serde(default)]
    pub unlocked: bool,
    /// Template fields.
    #[serde(flatten)]
    pub definition: RewardDefinition,
}

/// List a user's rewards.
pub async fn list_rewards(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Reward>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    Ok(Json(state.repository().load_rewards(&user_id)?))
}

/// Offer a new reward. Re-offering an existing id is rejected so claims are never reset.
pub async fn offer_reward(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<OfferRequest>, JsonRejection>,
) -> Result<Json<Reward>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let Json(body) = body?;

    let _guard = state.write_guard().await;
    let repository = state.repository();
    match repository.get_reward(&user_id, &body.id) {
        Ok(_) => {
            return Err(GamificationError::InvalidData(format!(
                "reward {} already offered",
                body.id
            ))
            .into());
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err.into()),
    }

    let now = Utc::now();
    let mut reward = Reward::from_definition(body.id, user_id, &body.definition, now);
    if body.unlocked {
        reward.unlock(now);
    }
    repository.save_reward(&reward)?;

    tracing::info!(
        user_id = %reward.user_id,
        reward_id = %reward.id,
        points_cost = ?reward.points_cost,
        "Reward offered"
    );

    Ok(Json(reward))
}

/// Get one reward.
pub async fn get_reward(
    State(state): State<Arc<AppState>>,
    Path((user_id, reward_id)): Path<(String, String)>,
) -> Result<Json<Reward>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let reward_id: RewardId = parse_id(&reward_id)?;
    Ok(Json(state.repository().get_reward(&user_id, &reward_id)?))
}

/// Make a reward available.
pub async fn unlock_reward(
    State(state): State<Arc<AppState>>,
    Path((user_id, reward_id)): Path<(String, String)>,
) -> Result<Json<Reward>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let reward_id: RewardId = parse_id(&reward_id)?;

    let _guard = state.write_guard().await;
    let repository = state.repository();
    let mut reward = repository.get_reward(&user_id, &reward_id)?;
    reward.unlock(Utc::now());
    repository.save_reward(&reward)?;

    Ok(Json(reward))
}

/// Claim a reward, paying its point cost.
pub async fn claim_reward(
    State(state): State<Arc<AppState>>,
    Path((user_id, reward_id)): Path<(String, String)>,
) -> Result<Json<Outcome<RewardClaim>>, ApiError> {
    let user_id: UserId = parse_id(&user_id)?;
    let reward_id: RewardId = parse_id(&reward_id)?;

    let _guard = state.write_guard().await;
    let outcome = state.orchestrator.claim_reward(&user_id, &reward_id)?;

    Ok(Json(outcome))
}
