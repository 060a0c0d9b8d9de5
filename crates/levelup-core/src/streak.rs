//! Streak lifecycle.
//!
//! Two mechanisms read the same record:
//!
//! - [`Streak::record_activity`] is the stateful update path. It compares whole
//!   elapsed days (floor of the elapsed time divided by 24h) between the previous
//!   and the new activity.
//! - [`Streak::is_active_at`], [`Streak::is_broken_at`] and
//!   [`Streak::days_until_break`] are advisory hour-based queries (24h / 48h)
//!   for display. They never change the record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{StreakId, UserId};

/// Elapsed time within which a streak is considered visually active.
pub const ACTIVE_WINDOW_HOURS: i64 = 24;

/// Elapsed time after which a streak is considered broken.
pub const BREAK_AFTER_HOURS: i64 = 48;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A consecutive-activity counter for one streak type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    /// Record identifier.
    pub id: StreakId,

    /// The user.
    pub user_id: UserId,

    /// Streak type (e.g. `daily_login`, `daily_goal`).
    #[serde(rename = "type")]
    pub streak_type: String,

    /// Current consecutive count.
    pub current_streak: u32,

    /// Longest count ever reached. Never below `current_streak`.
    pub longest_streak: u32,

    /// When the streak was last maintained.
    pub last_activity_date: DateTime<Utc>,

    /// Whether the streak is running.
    pub is_active: bool,

    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// When the record was created.
    pub created_date: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_date: DateTime<Utc>,
}

/// What an activity did to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// A new streak was created at count 1.
    Started,
    /// Activity one day after the previous one; the count grew.
    Continued,
    /// Activity more than one day after the previous one; the count restarted at 1.
    Reset,
    /// Repeat activity within the same day; counters untouched.
    Unchanged,
}

impl Streak {
    /// Start a streak of `streak_type` with its first activity at `at`.
    pub fn start(
        user_id: UserId,
        streak_type: impl Into<String>,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StreakId::generate(),
            user_id,
            streak_type: streak_type.into(),
            current_streak: 1,
            longest_streak: 1,
            last_activity_date: at,
            is_active: true,
            metadata: None,
            created_date: now,
            updated_date: now,
        }
    }

    /// Start a streak from its definition.
    #[must_use]
    pub fn from_definition(
        user_id: UserId,
        definition: &StreakDefinition,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut streak = Self::start(user_id, definition.streak_type.clone(), at, now);
        streak.metadata.clone_from(&definition.metadata);
        streak
    }

    /// Apply an activity that happened at `at`.
    ///
    /// - one whole day since the last activity: the count grows
    /// - more than one day: the count restarts at 1 and the streak is re-activated
    /// - same day: counters untouched, only the timestamp moves forward
    ///
    /// An activity older than the stored one never moves `last_activity_date` back.
    pub fn record_activity(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) -> StreakTransition {
        let transition = match elapsed_days(self.last_activity_date, at) {
            1 => {
                self.current_streak = self.current_streak.saturating_add(1);
                self.longest_streak = self.longest_streak.max(self.current_streak);
                self.is_active = true;
                StreakTransition::Continued
            }
            days if days > 1 => {
                self.current_streak = 1;
                self.longest_streak = self.longest_streak.max(1);
                self.is_active = true;
                StreakTransition::Reset
            }
            _ => StreakTransition::Unchanged,
        };
        if at > self.last_activity_date {
            self.last_activity_date = at;
        }
        self.updated_date = now;
        transition
    }

    /// Whether the last activity falls within the 24h active window.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity_date <= Duration::hours(ACTIVE_WINDOW_HOURS)
    }

    /// Whether more than 48h have passed since the last activity.
    #[must_use]
    pub fn is_broken_at(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity_date > Duration::hours(BREAK_AFTER_HOURS)
    }

    /// Whole days (rounded up) left before the streak counts as broken.
    #[must_use]
    pub fn days_until_break(&self, now: DateTime<Utc>) -> u32 {
        let deadline = self.last_activity_date + Duration::hours(BREAK_AFTER_HOURS);
        let remaining = (deadline - now).num_milliseconds();
        if remaining <= 0 {
            return 0;
        }
        u32::try_from((remaining + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY).unwrap_or(u32::MAX)
    }

    /// Summarise the streak together with its next milestone.
    #[must_use]
    pub fn progress_summary(&self) -> StreakProgress {
        let next = next_milestone(self.current_streak);
        StreakProgress {
            user_id: self.user_id.clone(),
            streak_type: self.streak_type.clone(),
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            is_active: self.is_active,
            days_until_milestone: next.map(|m| m.days - self.current_streak),
            next_milestone: next.map(|m| m.days),
        }
    }
}

/// Whole days between two activities, rounded down.
#[must_use]
pub fn elapsed_days(previous: DateTime<Utc>, current: DateTime<Utc>) -> i64 {
    (current - previous)
        .num_milliseconds()
        .div_euclid(MILLIS_PER_DAY)
}

/// Template describing a streak type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakDefinition {
    /// Streak type.
    #[serde(rename = "type")]
    pub streak_type: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the streak resets when a day is missed.
    pub reset_on_miss: bool,
    /// Timezone the host uses for daily streaks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Progress projection of a streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakProgress {
    /// The user.
    pub user_id: UserId,
    /// Streak type.
    #[serde(rename = "type")]
    pub streak_type: String,
    /// Current count.
    pub current_streak: u32,
    /// Longest count.
    pub longest_streak: u32,
    /// Whether the streak is running.
    pub is_active: bool,
    /// Days left until the next milestone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_milestone: Option<u32>,
    /// Day count of the next milestone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_milestone: Option<u32>,
}

/// Named tier of a streak milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneTier {
    /// One week.
    Bronze,
    /// Two weeks.
    Silver,
    /// One month.
    Gold,
    /// Two months.
    Platinum,
    /// One hundred days.
    Diamond,
    /// One year.
    Legendary,
}

/// A streak length that earns a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakMilestone {
    /// Streak length in days.
    pub days: u32,
    /// Tier name.
    pub tier: MilestoneTier,
    /// Points awarded on reaching it.
    pub points: i64,
}

/// Milestones in ascending day order.
pub static STREAK_MILESTONES: &[StreakMilestone] = &[
    StreakMilestone {
        days: 7,
        tier: MilestoneTier::Bronze,
        points: 50,
    },
    StreakMilestone {
        days: 14,
        tier: MilestoneTier::Silver,
        points: 100,
    },
    StreakMilestone {
        days: 30,
        tier: MilestoneTier::Gold,
        points: 250,
    },
    StreakMilestone {
        days: 60,
        tier: MilestoneTier::Platinum,
        points: 500,
    },
    StreakMilestone {
        days: 100,
        tier: MilestoneTier::Diamond,
        points: 1000,
    },
    StreakMilestone {
        days: 365,
        tier: MilestoneTier::Legendary,
        points: 5000,
    },
];

/// The first milestone not yet reached by `current_streak`.
#[must_use]
pub fn next_milestone(current_streak: u32) -> Option<&'static StreakMilestone> {
    STREAK_MILESTONES.iter().find(|m| m.days > current_streak)
}

/// Milestones already reached by `current_streak`.
pub fn achieved_milestones(current_streak: u32) -> impl Iterator<Item = &'static StreakMilestone> {
    STREAK_MILESTONES
        .iter()
        .take_while(move |m| m.days <= current_streak)
}

/// The milestone that is exactly `current_streak` days long, if any.
#[must_use]
pub fn milestone_at(current_streak: u32) -> Option<&'static StreakMilestone> {
    STREAK_MILESTONES.iter().find(|m| m.days == current_streak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn streak_at(current: u32, longest: u32, last: DateTime<Utc>) -> Streak {
        let mut streak = Streak::start(user(), "daily_login", last, last);
        streak.current_streak = current;
        streak.longest_streak = longest;
        streak
    }

    #[test]
    fn start_counts_one() {
        let now = Utc::now();
        let streak = Streak::start(user(), "daily_login", now, now);
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
        assert!(streak.is_active);
    }

    #[test]
    fn next_day_continues() {
        let last = Utc::now() - Duration::hours(30);
        let mut streak = streak_at(4, 4, last);
        let at = last + Duration::hours(30);
        assert_eq!(streak.record_activity(at, at), StreakTransition::Continued);
        assert_eq!(streak.current_streak, 5);
        assert_eq!(streak.longest_streak, 5);
        assert_eq!(streak.last_activity_date, at);
    }

    #[test]
    fn three_days_later_resets_but_keeps_longest() {
        let now = Utc::now();
        let mut streak = streak_at(5, 5, now - Duration::days(3));
        streak.is_active = false;
        assert_eq!(streak.record_activity(now, now), StreakTransition::Reset);
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 5);
        assert!(streak.is_active);
    }

    #[test]
    fn same_day_repeat_only_moves_timestamp() {
        let last = Utc::now() - Duration::hours(10);
        let mut streak = streak_at(3, 7, last);
        let first = last + Duration::hours(2);
        let second = last + Duration::hours(5);
        assert_eq!(streak.record_activity(first, first), StreakTransition::Unchanged);
        assert_eq!(streak.record_activity(second, second), StreakTransition::Unchanged);
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 7);
        assert_eq!(streak.last_activity_date, second);
    }

    #[test]
    fn backdated_activity_does_not_rewind() {
        let last = Utc::now();
        let mut streak = streak_at(2, 2, last);
        let earlier = last - Duration::days(2);
        assert_eq!(streak.record_activity(earlier, last), StreakTransition::Unchanged);
        assert_eq!(streak.last_activity_date, last);
        assert_eq!(streak.current_streak, 2);
    }

    #[test]
    fn longest_never_below_current() {
        let mut at = Utc::now() - Duration::days(20);
        let mut streak = Streak::start(user(), "daily_goal", at, at);
        for step in [1, 1, 1, 3, 1, 0, 1] {
            at += Duration::days(step) + Duration::minutes(5);
            streak.record_activity(at, at);
            assert!(streak.longest_streak >= streak.current_streak);
        }
        assert_eq!(streak.longest_streak, 4);
    }

    #[test]
    fn advisory_windows() {
        let now = Utc::now();
        let fresh = streak_at(1, 1, now - Duration::hours(20));
        assert!(fresh.is_active_at(now));
        assert!(!fresh.is_broken_at(now));
        assert_eq!(fresh.days_until_break(now), 2);

        let grace = streak_at(1, 1, now - Duration::hours(30));
        assert!(!grace.is_active_at(now));
        assert!(!grace.is_broken_at(now));
        assert_eq!(grace.days_until_break(now), 1);

        let broken = streak_at(1, 1, now - Duration::hours(49));
        assert!(broken.is_broken_at(now));
        assert_eq!(broken.days_until_break(now), 0);
    }

    #[test]
    fn milestone_table_lookups() {
        assert_eq!(next_milestone(0).map(|m| m.days), Some(7));
        assert_eq!(next_milestone(7).map(|m| m.days), Some(14));
        assert_eq!(next_milestone(364).map(|m| m.tier), Some(MilestoneTier::Legendary));
        assert!(next_milestone(365).is_none());
        assert_eq!(achieved_milestones(30).count(), 3);
        assert_eq!(milestone_at(14).map(|m| m.points), Some(100));
        assert!(milestone_at(15).is_none());
    }

    #[test]
    fn progress_summary_reports_next_milestone() {
        let streak = streak_at(10, 12, Utc::now());
        let summary = streak.progress_summary();
        assert_eq!(summary.next_milestone, Some(14));
        assert_eq!(summary.days_until_milestone, Some(4));
    }
}
