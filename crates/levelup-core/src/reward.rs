//! Rewards and claims.
//!
//! Claiming is a one-time transition. The claim itself does not check expiry, level or
//! balance; gating and payment are applied by whoever sequences the claim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ClaimId, GamificationError, Rarity, Result, RewardId, UserId};

/// A reward offered to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Reward identifier.
    pub id: RewardId,

    /// The user the reward is offered to.
    pub user_id: UserId,

    /// Reward type (e.g. `badge`, `unlock`, `discount`).
    #[serde(rename = "type")]
    pub reward_type: String,

    /// Display title.
    pub title: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Points required to claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_cost: Option<i64>,

    /// Level required to claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_required: Option<u32>,

    /// Rarity tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,

    /// Whether the reward is available to the user.
    pub unlocked: bool,

    /// When the reward became available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_date: Option<DateTime<Utc>>,

    /// Whether the reward has been claimed.
    pub claimed: bool,

    /// When the reward was claimed. Set iff `claimed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_date: Option<DateTime<Utc>>,

    /// End of the claim window for time-limited rewards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// When the record was created.
    pub created_date: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_date: DateTime<Utc>,
}

impl Reward {
    /// Offer a reward built from a template. Starts locked and unclaimed.
    #[must_use]
    pub fn from_definition(
        id: RewardId,
        user_id: UserId,
        definition: &RewardDefinition,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            reward_type: definition.reward_type.clone(),
            title: definition.title.clone(),
            description: definition.description.clone(),
            icon: definition.icon.clone(),
            category: definition.category.clone(),
            points_cost: definition.points_cost,
            level_required: definition.level_required,
            rarity: definition.rarity,
            unlocked: false,
            unlocked_date: None,
            claimed: false,
            claimed_date: None,
            expires_at: definition.expires_at,
            metadata: definition.metadata.clone(),
            created_date: now,
            updated_date: now,
        }
    }

    /// Make the reward available. The first unlock time is kept.
    pub fn unlock(&mut self, now: DateTime<Utc>) {
        self.unlocked = true;
        self.unlocked_date.get_or_insert(now);
        self.updated_date = now;
    }

    /// Mark the reward claimed and produce the claim record.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the reward was already claimed; the reward is left
    /// untouched in that case.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Result<RewardClaim> {
        if self.claimed {
            return Err(GamificationError::InvalidData(format!(
                "reward {} already claimed",
                self.id
            )));
        }
        self.claimed = true;
        self.claimed_date = Some(now);
        self.updated_date = now;

        Ok(RewardClaim {
            id: ClaimId::generate(),
            user_id: self.user_id.clone(),
            reward_id: self.id.clone(),
            points_spent: self.points_cost,
            claimed_date: now,
            metadata: None,
        })
    }

    /// Whether `level` satisfies the level requirement.
    #[must_use]
    pub fn level_allows(&self, level: u32) -> bool {
        self.level_required.map_or(true, |required| level >= required)
    }
}

/// Template used to offer rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDefinition {
    /// Reward type.
    #[serde(rename = "type")]
    pub reward_type: String,
    /// Display title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Points required to claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_cost: Option<i64>,
    /// Level required to claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_required: Option<u32>,
    /// Rarity tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    /// End of the claim window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Record of a successful claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardClaim {
    /// Claim identifier.
    pub id: ClaimId,
    /// The claiming user.
    pub user_id: UserId,
    /// The claimed reward.
    pub reward_id: RewardId,
    /// The reward's point cost, echoed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_spent: Option<i64>,
    /// When the claim happened.
    pub claimed_date: DateTime<Utc>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Whether the reward's claim window has passed.
#[must_use]
pub fn is_reward_expired(reward: &Reward, now: DateTime<Utc>) -> bool {
    reward.expires_at.is_some_and(|expires_at| now > expires_at)
}
