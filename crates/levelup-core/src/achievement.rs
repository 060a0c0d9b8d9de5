//! Achievement types and progress rules.
//!
//! Progress updates and unlocking are deliberately separate operations: moving
//! `progress` past `requirement` never flips `unlocked` on its own. The caller
//! composes the two (see the orchestration layer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AchievementId, UserId};

/// An achievement tracked for a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Identifier, unique within the user's achievements.
    pub id: AchievementId,

    /// Owner of the achievement.
    pub user_id: UserId,

    /// Achievement type identifier (e.g. `first_goal`, `streak_7_days`).
    #[serde(rename = "type")]
    pub achievement_type: String,

    /// Display title.
    pub title: String,

    /// Display description.
    pub description: String,

    /// Optional icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Whether the achievement has been unlocked.
    pub unlocked: bool,

    /// When the achievement was unlocked. Set once, on the transition to unlocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_date: Option<DateTime<Utc>>,

    /// Current progress towards `requirement`.
    pub progress: u32,

    /// Value `progress` must reach for the achievement to be complete.
    pub requirement: u32,

    /// Points awarded when unlocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,

    /// Rarity tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,

    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// When the record was created.
    pub created_date: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_date: DateTime<Utc>,
}

impl Achievement {
    /// Instantiate a locked achievement for `user_id` from a template.
    #[must_use]
    pub fn from_definition(
        id: AchievementId,
        user_id: UserId,
        definition: &AchievementDefinition,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            achievement_type: definition.achievement_type.clone(),
            title: definition.title.clone(),
            description: definition.description.clone(),
            icon: definition.icon.clone(),
            category: definition.category.clone(),
            unlocked: false,
            unlocked_date: None,
            progress: 0,
            requirement: definition.requirement,
            points: definition
                .points
                .or_else(|| definition.rarity.map(points_for_rarity)),
            rarity: definition.rarity,
            metadata: definition.metadata.clone(),
            created_date: now,
            updated_date: now,
        }
    }

    /// Set progress without touching the unlocked state.
    #[must_use]
    pub fn with_progress(mut self, progress: u32, now: DateTime<Utc>) -> Self {
        self.progress = progress;
        self.updated_date = now;
        self
    }

    /// Force the achievement into the unlocked state.
    ///
    /// Progress is pinned to the requirement. `unlocked_date` keeps its first value
    /// if the achievement was already unlocked.
    #[must_use]
    pub fn unlocked_at(mut self, now: DateTime<Utc>) -> Self {
        self.progress = self.requirement;
        self.unlocked = true;
        self.unlocked_date.get_or_insert(now);
        self.updated_date = now;
        self
    }

    /// Whether the progress has reached the requirement but the unlock has not happened yet.
    #[must_use]
    pub fn is_pending_unlock(&self) -> bool {
        !self.unlocked && is_achievement_complete(self)
    }

    /// Summarise the achievement's progress.
    #[must_use]
    pub fn progress_summary(&self) -> AchievementProgress {
        AchievementProgress {
            achievement_id: self.id.clone(),
            user_id: self.user_id.clone(),
            current_value: self.progress,
            requirement: self.requirement,
            progress: calculate_achievement_progress(self),
            unlocked: self.unlocked,
        }
    }
}

/// Template used to instantiate achievements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    /// Achievement type identifier.
    #[serde(rename = "type")]
    pub achievement_type: String,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Optional icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Value progress must reach.
    pub requirement: u32,
    /// Points awarded on unlock. Falls back to the rarity's points when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    /// Rarity tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Progress projection of an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    /// The achievement.
    pub achievement_id: AchievementId,
    /// Its owner.
    pub user_id: UserId,
    /// Raw progress value.
    pub current_value: u32,
    /// Requirement to unlock.
    pub requirement: u32,
    /// Completion percentage (0-100).
    pub progress: u8,
    /// Whether it is unlocked.
    pub unlocked: bool,
}

/// Rarity tiers for achievements and rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Everyday accomplishments.
    Common,
    /// Uncommon accomplishments.
    Rare,
    /// Hard accomplishments.
    Epic,
    /// Exceptional accomplishments.
    Legendary,
}

/// Points granted for a rarity tier.
#[must_use]
pub const fn points_for_rarity(rarity: Rarity) -> i64 {
    match rarity {
        Rarity::Common => 10,
        Rarity::Rare => 25,
        Rarity::Epic => 50,
        Rarity::Legendary => 100,
    }
}

/// Whether the achievement's progress has reached its requirement.
#[must_use]
pub fn is_achievement_complete(achievement: &Achievement) -> bool {
    achievement.progress >= achievement.requirement
}

/// Completion percentage, rounded and capped at 100.
///
/// A zero requirement is trivially complete.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn calculate_achievement_progress(achievement: &Achievement) -> u8 {
    if achievement.requirement == 0 {
        return 100;
    }
    let ratio = f64::from(achievement.progress) / f64::from(achievement.requirement);
    (ratio * 100.0).round().min(100.0) as u8
}
