//! Leaderboards and rankings.
//!
//! Entries are kept sorted by score, highest first, and every mutation re-ranks the
//! whole collection so ranks are always exactly `1..=N`. Equal scores keep their
//! previous relative order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, LeaderboardId, UserId};

/// Time window a leaderboard or progress record covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    /// One day.
    Daily,
    /// One week.
    Weekly,
    /// One month.
    Monthly,
    /// No time limit.
    AllTime,
}

/// A user's position on a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// The ranked user.
    pub user_id: UserId,
    /// The leaderboard this entry belongs to.
    pub leaderboard_id: LeaderboardId,
    /// 1-based rank, assigned by the leaderboard.
    pub rank: u32,
    /// Score used for ranking.
    pub score: i64,
    /// Metric the score measures (e.g. `points`, `experience`).
    pub metric: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Period covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    /// Start of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    /// End of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
    /// When the entry was created.
    pub created_date: DateTime<Utc>,
    /// When the entry was last modified.
    pub updated_date: DateTime<Utc>,
}

impl LeaderboardEntry {
    /// A new, not yet ranked entry.
    pub fn new(
        leaderboard_id: LeaderboardId,
        user_id: UserId,
        score: i64,
        metric: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            leaderboard_id,
            rank: 0,
            score,
            metric: metric.into(),
            display_name: None,
            avatar: None,
            metadata: None,
            period: None,
            period_start: None,
            period_end: None,
            created_date: now,
            updated_date: now,
        }
    }
}

/// A ranked collection of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    /// Leaderboard identifier.
    pub id: LeaderboardId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Metric entries are ranked by.
    pub metric: String,
    /// Period covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    /// Start of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    /// End of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
    /// Entries ordered by score descending.
    pub entries: Vec<LeaderboardEntry>,
    /// Number of entries in the full collection.
    pub total_participants: u32,
    /// When the collection last changed.
    pub last_updated: DateTime<Utc>,
}

impl Leaderboard {
    /// An empty leaderboard named after its id, ranking by `score`.
    #[must_use]
    pub fn empty(id: LeaderboardId, now: DateTime<Utc>) -> Self {
        Self {
            name: id.to_string(),
            id,
            description: None,
            metric: "score".to_string(),
            period: None,
            period_start: None,
            period_end: None,
            entries: Vec::new(),
            total_participants: 0,
            last_updated: now,
        }
    }

    /// Replace or insert `entry` by id, then re-rank everything.
    ///
    /// Returns the stored entry carrying its new rank.
    pub fn upsert(&mut self, entry: LeaderboardEntry, now: DateTime<Utc>) -> LeaderboardEntry {
        let mut stored = entry.clone();
        match self.entries.iter_mut().find(|e| e.id == stored.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.rerank();
        self.last_updated = now;

        if let Some(ranked) = self.entries.iter().find(|e| e.id == stored.id) {
            stored.rank = ranked.rank;
        }
        stored
    }

    /// Sort by score descending (stable) and assign contiguous ranks.
    pub fn rerank(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = u32::try_from(index + 1).unwrap_or(u32::MAX);
        }
        self.total_participants = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
    }

    /// Ranking details for `user_id`, if the user has an entry.
    #[must_use]
    pub fn ranking_for(&self, user_id: &UserId) -> Option<LeaderboardRanking> {
        self.entries
            .iter()
            .find(|e| &e.user_id == user_id)
            .map(|entry| LeaderboardRanking::new(entry, self.total_participants))
    }

    /// A view holding `limit` entries after skipping `offset`.
    ///
    /// `total_participants` still describes the full collection.
    #[must_use]
    pub fn page(mut self, offset: Option<usize>, limit: Option<usize>) -> Self {
        let skip = offset.unwrap_or(0).min(self.entries.len());
        self.entries.drain(..skip);
        if let Some(limit) = limit {
            self.entries.truncate(limit);
        }
        self
    }
}

/// A user's standing on a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRanking {
    /// The user.
    pub user_id: UserId,
    /// 1-based rank.
    pub rank: u32,
    /// Score.
    pub score: i64,
    /// `(total - rank) / total * 100`.
    pub percentile: f64,
    /// Number of users ranked above.
    pub above_users: u32,
    /// Number of users ranked below.
    pub below_users: u32,
}

impl LeaderboardRanking {
    /// Ranking details of `entry` among `total_participants`.
    #[must_use]
    pub fn new(entry: &LeaderboardEntry, total_participants: u32) -> Self {
        Self {
            user_id: entry.user_id.clone(),
            rank: entry.rank,
            score: entry.score,
            percentile: percentile(entry.rank, total_participants),
            above_users: entry.rank.saturating_sub(1),
            below_users: total_participants.saturating_sub(entry.rank),
        }
    }
}

/// Percentile of `rank` among `total` participants. Zero when there are none.
#[must_use]
pub fn percentile(rank: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(total) - f64::from(rank)) / f64::from(total) * 100.0
}

/// Direction a user moved between two rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankChange {
    /// Moved to a better (smaller) rank.
    Up,
    /// Moved to a worse (larger) rank.
    Down,
    /// Rank unchanged.
    Same,
    /// No previous rank.
    New,
}

/// Compare a previous rank with the current one.
#[must_use]
pub fn rank_change(previous: Option<u32>, current: u32) -> RankChange {
    match previous {
        None => RankChange::New,
        Some(prev) if prev > current => RankChange::Up,
        Some(prev) if prev < current => RankChange::Down,
        Some(_) => RankChange::Same,
    }
}

/// The first `n` entries of a ranked slice.
#[must_use]
pub fn top_entries(entries: &[LeaderboardEntry], n: usize) -> &[LeaderboardEntry] {
    &entries[..n.min(entries.len())]
}

/// Rank of `user_id` in a ranked slice.
#[must_use]
pub fn find_user_rank(entries: &[LeaderboardEntry], user_id: &UserId) -> Option<u32> {
    entries.iter().find(|e| &e.user_id == user_id).map(|e| e.rank)
}
