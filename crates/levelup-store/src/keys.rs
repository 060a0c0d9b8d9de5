//! Storage key layout.
//!
//! Every collection lives under a single key of the form
//! `<namespace>:<family>:<owner>`, where the owner is a user id (or a leaderboard id
//! for leaderboards). The default namespace is `@gamification`.

use levelup_core::{LeaderboardId, UserId};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "@gamification";

/// Collection families stored by the repository.
pub mod family {
    /// Achievement list per user.
    pub const ACHIEVEMENTS: &str = "achievements";

    /// Balance snapshot per user. The balance is derived from the ledger on every read;
    /// the key is reserved so that no other data is written under it.
    pub const POINTS: &str = "points";

    /// Point ledger per user, newest first.
    pub const POINT_TRANSACTIONS: &str = "point_transactions";

    /// Level record per user.
    pub const LEVEL: &str = "level";

    /// Streak list per user.
    pub const STREAKS: &str = "streaks";

    /// Leaderboard per leaderboard id.
    pub const LEADERBOARDS: &str = "leaderboards";

    /// Reward list per user.
    pub const REWARDS: &str = "rewards";

    /// Progress list per user.
    pub const PROGRESS: &str = "progress";
}

/// Returns every family name.
#[must_use]
pub fn all_families() -> Vec<&'static str> {
    vec![
        family::ACHIEVEMENTS,
        family::POINTS,
        family::POINT_TRANSACTIONS,
        family::LEVEL,
        family::STREAKS,
        family::LEADERBOARDS,
        family::REWARDS,
        family::PROGRESS,
    ]
}

/// Builds namespaced storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl KeySpace {
    /// A key space under `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The namespace prefix.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key for `family` owned by `owner`.
    #[must_use]
    pub fn key(&self, family: &str, owner: &str) -> String {
        format!("{}:{family}:{owner}", self.namespace)
    }

    /// Achievement list key.
    #[must_use]
    pub fn achievements(&self, user_id: &UserId) -> String {
        self.key(family::ACHIEVEMENTS, user_id.as_str())
    }

    /// Balance snapshot key.
    #[must_use]
    pub fn points(&self, user_id: &UserId) -> String {
        self.key(family::POINTS, user_id.as_str())
    }

    /// Point ledger key.
    #[must_use]
    pub fn point_transactions(&self, user_id: &UserId) -> String {
        self.key(family::POINT_TRANSACTIONS, user_id.as_str())
    }

    /// Level record key.
    #[must_use]
    pub fn level(&self, user_id: &UserId) -> String {
        self.key(family::LEVEL, user_id.as_str())
    }

    /// Streak list key.
    #[must_use]
    pub fn streaks(&self, user_id: &UserId) -> String {
        self.key(family::STREAKS, user_id.as_str())
    }

    /// Leaderboard key.
    #[must_use]
    pub fn leaderboard(&self, leaderboard_id: &LeaderboardId) -> String {
        self.key(family::LEADERBOARDS, leaderboard_id.as_str())
    }

    /// Reward list key.
    #[must_use]
    pub fn rewards(&self, user_id: &UserId) -> String {
        self.key(family::REWARDS, user_id.as_str())
    }

    /// Progress list key.
    #[must_use]
    pub fn progress(&self, user_id: &UserId) -> String {
        self.key(family::PROGRESS, user_id.as_str())
    }
}
