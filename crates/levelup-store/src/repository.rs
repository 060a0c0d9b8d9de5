//! The gamification repository.
//!
//! [`GamificationRepository`] is the query/command surface over a [`KeyValueStore`].
//! It keeps no state between calls: every method reads the collection it needs,
//! applies the rule from `levelup-core`, and performs at most one write.
//!
//! Storage failures surface as `LOAD_FAILED` / `SAVE_FAILED`, missing records as
//! `NOT_FOUND`. Nothing here composes entity families; progress updates never unlock
//! achievements and reward claims never touch points.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use levelup_core::{
    ledger_total, Achievement, AchievementId, GamificationError, Leaderboard, LeaderboardEntry,
    LeaderboardId, LeaderboardRanking, Level, LevelProgress, PointBalance, PointGrant,
    PointTransaction, Progress, ProgressUpdate, Result, Reward, RewardClaim, RewardId, Streak,
    StreakTransition, UserId,
};

use crate::keys::KeySpace;
use crate::KeyValueStore;

/// Stateless repository over a key-value store.
#[derive(Debug, Clone)]
pub struct GamificationRepository<S> {
    store: S,
    keys: KeySpace,
}

impl<S: KeyValueStore> GamificationRepository<S> {
    /// A repository using the default key namespace.
    pub fn new(store: S) -> Self {
        Self::with_key_space(store, KeySpace::default())
    }

    /// A repository using a custom key space.
    pub fn with_key_space(store: S, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The key layout in use.
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    // =========================================================================
    // Achievements
    // =========================================================================

    /// Load all achievements of a user. A user with none yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the collection cannot be read or decoded.
    pub fn load_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        self.load_collection(&self.keys.achievements(user_id))
    }

    /// Replace a user's achievement collection.
    ///
    /// The owner is taken from the records. An empty slice is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the records belong to more than one user, or
    /// `SAVE_FAILED` if the write fails.
    pub fn save_achievements(&self, achievements: &[Achievement]) -> Result<()> {
        let Some(first) = achievements.first() else {
            return Ok(());
        };
        if let Some(other) = achievements.iter().find(|a| a.user_id != first.user_id) {
            return Err(GamificationError::InvalidData(format!(
                "achievements of {} and {} cannot be saved together",
                first.user_id, other.user_id
            )));
        }
        self.save_json(&self.keys.achievements(&first.user_id), achievements)
    }

    /// Find one achievement.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user has no such achievement.
    pub fn get_achievement(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
    ) -> Result<Achievement> {
        self.load_achievements(user_id)?
            .into_iter()
            .find(|a| &a.id == achievement_id)
            .ok_or_else(|| GamificationError::not_found("achievement", achievement_id))
    }

    /// Set an achievement's progress. Never unlocks it.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the achievement is missing, or a storage error.
    pub fn update_achievement_progress(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
        progress: u32,
    ) -> Result<Achievement> {
        let updated = self.modify_achievement(user_id, achievement_id, |a| {
            a.with_progress(progress, Utc::now())
        })?;
        tracing::debug!(
            user_id = %user_id,
            achievement_id = %achievement_id,
            progress,
            requirement = updated.requirement,
            "Updated achievement progress"
        );
        Ok(updated)
    }

    /// Unlock an achievement, pinning its progress to the requirement.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the achievement is missing, or a storage error.
    pub fn unlock_achievement(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
    ) -> Result<Achievement> {
        let unlocked =
            self.modify_achievement(user_id, achievement_id, |a| a.unlocked_at(Utc::now()))?;
        tracing::info!(
            user_id = %user_id,
            achievement_id = %achievement_id,
            "Unlocked achievement"
        );
        Ok(unlocked)
    }

    fn modify_achievement(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
        change: impl FnOnce(Achievement) -> Achievement,
    ) -> Result<Achievement> {
        let mut achievements = self.load_achievements(user_id)?;
        let index = achievements
            .iter()
            .position(|a| &a.id == achievement_id)
            .ok_or_else(|| GamificationError::not_found("achievement", achievement_id))?;

        let updated = change(achievements[index].clone());
        achievements[index] = updated.clone();
        self.save_json(&self.keys.achievements(user_id), &achievements)?;
        Ok(updated)
    }

    // =========================================================================
    // Points
    // =========================================================================

    /// Derive the balance from the full ledger.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the ledger cannot be read, or `INVALID_DATA` if its
    /// sums overflow.
    pub fn load_point_balance(&self, user_id: &UserId) -> Result<PointBalance> {
        let ledger = self.load_point_transactions(user_id, None)?;
        PointBalance::from_ledger(user_id.clone(), &ledger, Utc::now())
    }

    /// Load the ledger, newest first, optionally keeping only the first `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the ledger cannot be read.
    pub fn load_point_transactions(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<PointTransaction>> {
        let mut ledger: Vec<PointTransaction> =
            self.load_collection(&self.keys.point_transactions(user_id))?;
        if let Some(limit) = limit {
            ledger.truncate(limit);
        }
        Ok(ledger)
    }

    /// Prepend a transaction for `grant` to the ledger.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure, or `INVALID_DATA` if
    /// the new balance would overflow. Nothing is written if the read or the balance
    /// check fails.
    pub fn add_points(&self, user_id: &UserId, grant: PointGrant) -> Result<PointTransaction> {
        let key = self.keys.point_transactions(user_id);
        let mut ledger: Vec<PointTransaction> = self.load_collection(&key)?;

        let transaction =
            PointTransaction::record(user_id.clone(), grant, ledger_total(&ledger)?, Utc::now())?;
        ledger.insert(0, transaction.clone());
        self.save_json(&key, &ledger)?;

        tracing::debug!(
            user_id = %user_id,
            amount = transaction.amount,
            balance = transaction.balance,
            source = %transaction.source,
            "Recorded point transaction"
        );
        Ok(transaction)
    }

    /// Record a deduction of `grant.amount` points. The category is dropped.
    ///
    /// The balance is allowed to go negative; callers that must prevent this check
    /// the balance first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_points`].
    pub fn deduct_points(&self, user_id: &UserId, grant: PointGrant) -> Result<PointTransaction> {
        self.add_points(user_id, grant.into_deduction()?)
    }

    // =========================================================================
    // Levels
    // =========================================================================

    /// Load the level record, defaulting to level 1 with no experience.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the record cannot be read or decoded.
    pub fn load_level(&self, user_id: &UserId) -> Result<Level> {
        Ok(self
            .load_json(&self.keys.level(user_id))?
            .unwrap_or_else(|| Level::initial(user_id.clone(), Utc::now())))
    }

    /// Persist a level record.
    ///
    /// # Errors
    ///
    /// Returns `SAVE_FAILED` if the write fails.
    pub fn save_level(&self, level: &Level) -> Result<()> {
        self.save_json(&self.keys.level(&level.user_id), level)
    }

    /// Add experience and persist the recomputed level.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure.
    pub fn add_experience(
        &self,
        user_id: &UserId,
        amount: u64,
        source: Option<&str>,
    ) -> Result<LevelProgress> {
        let (level, progress) = self.load_level(user_id)?.gain(amount, Utc::now());
        self.save_level(&level)?;

        if progress.can_level_up {
            tracing::info!(
                user_id = %user_id,
                level = progress.current_level,
                source = source.unwrap_or("unknown"),
                "Level up"
            );
        } else {
            tracing::debug!(
                user_id = %user_id,
                amount,
                total_experience = progress.total_experience,
                "Added experience"
            );
        }
        Ok(progress)
    }

    // =========================================================================
    // Streaks
    // =========================================================================

    /// Load all streaks of a user.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the collection cannot be read or decoded.
    pub fn load_streaks(&self, user_id: &UserId) -> Result<Vec<Streak>> {
        self.load_collection(&self.keys.streaks(user_id))
    }

    /// Find the streak of a given type.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user has no streak of that type.
    pub fn load_streak_by_type(&self, user_id: &UserId, streak_type: &str) -> Result<Streak> {
        self.load_streaks(user_id)?
            .into_iter()
            .find(|s| s.streak_type == streak_type)
            .ok_or_else(|| GamificationError::not_found("streak", streak_type))
    }

    /// Insert or replace a streak, matched by id.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure.
    pub fn save_streak(&self, streak: &Streak) -> Result<()> {
        let key = self.keys.streaks(&streak.user_id);
        let mut streaks: Vec<Streak> = self.load_collection(&key)?;
        upsert(&mut streaks, streak.clone(), |s| s.id == streak.id);
        self.save_json(&key, &streaks)
    }

    /// Apply an activity to the streak of `streak_type`, creating it at count 1 when
    /// the user has none yet.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure.
    pub fn update_streak_activity(
        &self,
        user_id: &UserId,
        streak_type: &str,
        activity_date: DateTime<Utc>,
    ) -> Result<(Streak, StreakTransition)> {
        let key = self.keys.streaks(user_id);
        let mut streaks: Vec<Streak> = self.load_collection(&key)?;
        let now = Utc::now();

        let (streak, transition) =
            if let Some(index) = streaks.iter().position(|s| s.streak_type == streak_type) {
                let transition = streaks[index].record_activity(activity_date, now);
                (streaks[index].clone(), transition)
            } else {
                let streak = Streak::start(user_id.clone(), streak_type, activity_date, now);
                streaks.push(streak.clone());
                (streak, StreakTransition::Started)
            };
        self.save_json(&key, &streaks)?;

        tracing::debug!(
            user_id = %user_id,
            streak_type,
            current = streak.current_streak,
            longest = streak.longest_streak,
            ?transition,
            "Updated streak"
        );
        Ok((streak, transition))
    }

    // =========================================================================
    // Leaderboards
    // =========================================================================

    /// Load a leaderboard, skipping `offset` entries and then keeping `limit`.
    ///
    /// A leaderboard that was never written is returned empty, named after its id.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the leaderboard cannot be read or decoded.
    pub fn load_leaderboard(
        &self,
        leaderboard_id: &LeaderboardId,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Leaderboard> {
        Ok(self.load_full_leaderboard(leaderboard_id)?.page(offset, limit))
    }

    /// A user's ranking on a leaderboard.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user has no entry.
    pub fn get_user_ranking(
        &self,
        user_id: &UserId,
        leaderboard_id: &LeaderboardId,
    ) -> Result<LeaderboardRanking> {
        self.load_full_leaderboard(leaderboard_id)?
            .ranking_for(user_id)
            .ok_or_else(|| GamificationError::not_found("leaderboard entry", user_id))
    }

    /// Insert or replace an entry (matched by id) and re-rank the leaderboard.
    ///
    /// Returns the entry with its assigned rank.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure.
    pub fn update_leaderboard_entry(&self, entry: LeaderboardEntry) -> Result<LeaderboardEntry> {
        let leaderboard_id = entry.leaderboard_id.clone();
        let mut leaderboard = self.load_full_leaderboard(&leaderboard_id)?;
        let ranked = leaderboard.upsert(entry, Utc::now());
        self.save_json(&self.keys.leaderboard(&leaderboard_id), &leaderboard)?;

        tracing::debug!(
            leaderboard_id = %leaderboard_id,
            user_id = %ranked.user_id,
            score = ranked.score,
            rank = ranked.rank,
            "Updated leaderboard entry"
        );
        Ok(ranked)
    }

    fn load_full_leaderboard(&self, leaderboard_id: &LeaderboardId) -> Result<Leaderboard> {
        Ok(self
            .load_json(&self.keys.leaderboard(leaderboard_id))?
            .unwrap_or_else(|| Leaderboard::empty(leaderboard_id.clone(), Utc::now())))
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    /// Load all rewards of a user.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the collection cannot be read or decoded.
    pub fn load_rewards(&self, user_id: &UserId) -> Result<Vec<Reward>> {
        self.load_collection(&self.keys.rewards(user_id))
    }

    /// Find one reward.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user has no such reward.
    pub fn get_reward(&self, user_id: &UserId, reward_id: &RewardId) -> Result<Reward> {
        self.load_rewards(user_id)?
            .into_iter()
            .find(|r| &r.id == reward_id)
            .ok_or_else(|| GamificationError::not_found("reward", reward_id))
    }

    /// Insert or replace a reward, matched by id.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure.
    pub fn save_reward(&self, reward: &Reward) -> Result<()> {
        let key = self.keys.rewards(&reward.user_id);
        let mut rewards: Vec<Reward> = self.load_collection(&key)?;
        upsert(&mut rewards, reward.clone(), |r| r.id == reward.id);
        self.save_json(&key, &rewards)
    }

    /// Mark a reward claimed.
    ///
    /// Does not check expiry, level or balance and does not deduct points.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` for an unknown reward, `INVALID_DATA` if it was already
    /// claimed, or a storage error.
    pub fn claim_reward(&self, user_id: &UserId, reward_id: &RewardId) -> Result<RewardClaim> {
        let key = self.keys.rewards(user_id);
        let mut rewards: Vec<Reward> = self.load_collection(&key)?;
        let reward = rewards
            .iter_mut()
            .find(|r| &r.id == reward_id)
            .ok_or_else(|| GamificationError::not_found("reward", reward_id))?;

        let claim = reward.claim(Utc::now())?;
        self.save_json(&key, &rewards)?;

        tracing::info!(user_id = %user_id, reward_id = %reward_id, "Claimed reward");
        Ok(claim)
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Load a user's progress records, optionally only those for `metric`.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` if the collection cannot be read or decoded.
    pub fn load_progress(&self, user_id: &UserId, metric: Option<&str>) -> Result<Vec<Progress>> {
        let mut records: Vec<Progress> = self.load_collection(&self.keys.progress(user_id))?;
        if let Some(metric) = metric {
            records.retain(|p| p.metric == metric);
        }
        Ok(records)
    }

    /// Insert or replace a progress record, matched by id.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure.
    pub fn save_progress(&self, progress: &Progress) -> Result<()> {
        let key = self.keys.progress(&progress.user_id);
        let mut records: Vec<Progress> = self.load_collection(&key)?;
        upsert(&mut records, progress.clone(), |p| p.id == progress.id);
        self.save_json(&key, &records)
    }

    /// Increment the record for `(update.user_id, update.metric)`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `LOAD_FAILED` / `SAVE_FAILED` on storage failure, or `INVALID_DATA` if
    /// the increment, the target or the new total is not a finite number. Nothing is
    /// written in that case.
    pub fn update_progress(&self, update: ProgressUpdate) -> Result<Progress> {
        let key = self.keys.progress(&update.user_id);
        let mut records: Vec<Progress> = self.load_collection(&key)?;
        let now = Utc::now();

        let progress = if let Some(index) = records.iter().position(|p| p.metric == update.metric)
        {
            records[index].apply(&update, now)?;
            records[index].clone()
        } else {
            let progress = Progress::start(update, now)?;
            records.push(progress.clone());
            progress
        };
        self.save_json(&key, &records)?;

        tracing::debug!(
            user_id = %progress.user_id,
            metric = %progress.metric,
            value = progress.current_value,
            percent = progress.progress,
            "Updated progress"
        );
        Ok(progress)
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.load_json(key)?.unwrap_or_default())
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = self.store.get(key).map_err(|e| {
            tracing::warn!(key, error = %e, "Storage read failed");
            GamificationError::LoadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| {
                tracing::warn!(key, error = %e, "Stored value could not be decoded");
                GamificationError::LoadFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })
        })
        .transpose()
    }

    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|e| GamificationError::SaveFailed {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        self.store.set(key, &raw).map_err(|e| {
            tracing::warn!(key, error = %e, "Storage write failed");
            GamificationError::SaveFailed {
                key: key.to_string(),
                message: e.to_string(),
            }
        })
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, matches: impl Fn(&T) -> bool) {
    match items.iter().position(matches) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}
