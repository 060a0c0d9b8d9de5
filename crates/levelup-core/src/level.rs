//! Experience and level rules.
//!
//! Two separate laws live here and must not be mixed:
//!
//! - **Account level** ([`level_from_experience_linear`]): 100 XP per level,
//!   level 1 at 0 XP. This drives the stored [`Level`] record.
//! - **Point tier** ([`level_from_points_sqrt`]): `floor(sqrt(points / 100))`,
//!   a generic lookup used for point-based tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LevelId, UserId};

/// Experience needed to advance one account level.
pub const XP_PER_LEVEL: u64 = 100;

/// A user's account level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    /// Record identifier (`{user_id}-level`).
    pub id: LevelId,

    /// The user.
    pub user_id: UserId,

    /// Current level, starting at 1.
    pub current_level: u32,

    /// Experience earned inside the current level.
    pub current_experience: u64,

    /// Experience accumulated overall.
    pub total_experience: u64,

    /// Experience still needed to reach the next level.
    pub experience_to_next_level: u64,

    /// Percentage progress inside the current level (0-100).
    pub level_progress: u8,

    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// When the record was created.
    pub created_date: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_date: DateTime<Utc>,
}

impl Level {
    /// The level record of a user with no experience.
    #[must_use]
    pub fn initial(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: user_id.level_id(),
            user_id,
            current_level: 1,
            current_experience: 0,
            total_experience: 0,
            experience_to_next_level: XP_PER_LEVEL,
            level_progress: 0,
            metadata: None,
            created_date: now,
            updated_date: now,
        }
    }

    /// Recompute every derived field from a new experience total.
    #[must_use]
    pub fn with_total_experience(mut self, total_experience: u64, now: DateTime<Utc>) -> Self {
        let current_experience = total_experience % XP_PER_LEVEL;
        self.total_experience = total_experience;
        self.current_level = level_from_experience_linear(total_experience);
        self.current_experience = current_experience;
        self.experience_to_next_level = XP_PER_LEVEL - current_experience;
        self.level_progress = level_progress_percent(current_experience);
        self.updated_date = now;
        self
    }

    /// Add experience, returning the updated record and its progress summary.
    #[must_use]
    pub fn gain(self, amount: u64, now: DateTime<Utc>) -> (Self, LevelProgress) {
        let previous_level = self.current_level;
        let total = add_experience(self.total_experience, amount);
        let updated = self.with_total_experience(total, now);
        let progress = updated.progress_summary(previous_level);
        (updated, progress)
    }

    /// Summarise the record, comparing against the level held before the last change.
    #[must_use]
    pub fn progress_summary(&self, previous_level: u32) -> LevelProgress {
        LevelProgress {
            user_id: self.user_id.clone(),
            current_level: self.current_level,
            current_experience: self.current_experience,
            total_experience: self.total_experience,
            experience_to_next_level: self.experience_to_next_level,
            level_progress: self.level_progress,
            can_level_up: self.current_level > previous_level,
        }
    }
}

/// Threshold description for a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    /// The level.
    pub level: u32,
    /// Total experience required to reach it.
    pub experience_required: u64,
    /// Optional title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reward ids or types granted on reaching the level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewards: Vec<String>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl LevelDefinition {
    /// The definition of `level` under the 100-XP-per-level law.
    #[must_use]
    pub fn linear(level: u32) -> Self {
        Self {
            level,
            experience_required: u64::from(level.saturating_sub(1)) * XP_PER_LEVEL,
            title: None,
            description: None,
            rewards: Vec::new(),
            metadata: None,
        }
    }
}

/// Result of an experience change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// The user.
    pub user_id: UserId,
    /// Level after the change.
    pub current_level: u32,
    /// Experience inside the current level.
    pub current_experience: u64,
    /// Experience overall.
    pub total_experience: u64,
    /// Experience still needed for the next level.
    pub experience_to_next_level: u64,
    /// Percentage progress inside the current level.
    pub level_progress: u8,
    /// True iff the change moved the user past the stored level.
    pub can_level_up: bool,
}

/// Add experience to a running total.
#[must_use]
pub const fn add_experience(total: u64, delta: u64) -> u64 {
    total.saturating_add(delta)
}

/// Account level for an experience total: `floor(total / 100) + 1`.
#[must_use]
pub fn level_from_experience_linear(total_experience: u64) -> u32 {
    u32::try_from(total_experience / XP_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// Point tier: `floor(sqrt(points / 100))`.
#[must_use]
pub fn level_from_points_sqrt(points: u64) -> u32 {
    u32::try_from(integer_sqrt(points / 100)).unwrap_or(u32::MAX)
}

/// Points at which the next point tier starts: `(tier + 1)^2 * 100`.
#[must_use]
pub fn points_for_next_sqrt_level(points: u64) -> u64 {
    let next = u64::from(level_from_points_sqrt(points)) + 1;
    next.saturating_mul(next).saturating_mul(100)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn level_progress_percent(current_experience: u64) -> u8 {
    (current_experience * 100 / XP_PER_LEVEL) as u8
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn integer_sqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= n) {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn initial_level() {
        let level = Level::initial(user(), Utc::now());
        assert_eq!(level.id.as_str(), "user-1-level");
        assert_eq!(level.current_level, 1);
        assert_eq!(level.experience_to_next_level, 100);
        assert_eq!(level.level_progress, 0);
    }

    #[test]
    fn linear_level_law() {
        assert_eq!(level_from_experience_linear(0), 1);
        assert_eq!(level_from_experience_linear(99), 1);
        assert_eq!(level_from_experience_linear(100), 2);
        assert_eq!(level_from_experience_linear(250), 3);
    }

    #[test]
    fn derived_fields_for_250_xp() {
        let level = Level::initial(user(), Utc::now()).with_total_experience(250, Utc::now());
        assert_eq!(level.current_level, 3);
        assert_eq!(level.current_experience, 50);
        assert_eq!(level.experience_to_next_level, 50);
        assert_eq!(level.level_progress, 50);
    }

    #[test]
    fn gain_reports_level_up_only_when_crossing() {
        let now = Utc::now();
        let (level, progress) = Level::initial(user(), now).gain(60, now);
        assert!(!progress.can_level_up);
        assert_eq!(progress.current_level, 1);

        let (level, progress) = level.gain(60, now);
        assert!(progress.can_level_up);
        assert_eq!(progress.current_level, 2);
        assert_eq!(progress.current_experience, 20);
        assert_eq!(level.total_experience, 120);

        let (_, progress) = level.gain(0, now);
        assert!(!progress.can_level_up);
    }

    #[test]
    fn sqrt_tier_law_is_distinct() {
        assert_eq!(level_from_points_sqrt(0), 0);
        assert_eq!(level_from_points_sqrt(99), 0);
        assert_eq!(level_from_points_sqrt(100), 1);
        assert_eq!(level_from_points_sqrt(399), 1);
        assert_eq!(level_from_points_sqrt(400), 2);
        assert_eq!(level_from_points_sqrt(10_000), 10);
        assert_eq!(points_for_next_sqrt_level(0), 100);
        assert_eq!(points_for_next_sqrt_level(400), 900);

        // Same input, different laws.
        assert_eq!(level_from_experience_linear(400), 5);
        assert_eq!(level_from_points_sqrt(400), 2);
    }

    #[test]
    fn add_experience_saturates() {
        assert_eq!(add_experience(10, 5), 15);
        assert_eq!(add_experience(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn linear_definitions() {
        assert_eq!(LevelDefinition::linear(1).experience_required, 0);
        assert_eq!(LevelDefinition::linear(3).experience_required, 200);
    }
}
