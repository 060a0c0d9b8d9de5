//! Per-user application state.
//!
//! A [`GamificationSession`] is the state container a UI layer owns for the signed-in
//! user. It holds a [`GamificationSnapshot`] loaded from the repository and refreshes
//! it after every mutation, so the snapshot always mirrors storage.

use chrono::{DateTime, Utc};
use serde::Serialize;

use levelup_core::{
    is_reward_expired, Achievement, AchievementId, GamificationError, Level, LevelProgress,
    Period, PointBalance, PointGrant, PointTransaction, Progress, ProgressUpdate, Result, Reward,
    RewardClaim, RewardId, Streak, UserId,
};
use levelup_store::KeyValueStore;

use crate::orchestrator::{GamificationEvent, Orchestrator, Outcome};

/// Number of ledger entries kept in the snapshot.
pub const RECENT_TRANSACTIONS: usize = 10;

/// Everything the UI shows for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationSnapshot {
    /// Achievements.
    pub achievements: Vec<Achievement>,
    /// Point balance.
    pub point_balance: PointBalance,
    /// Newest ledger entries.
    pub recent_transactions: Vec<PointTransaction>,
    /// Level record.
    pub level: Level,
    /// Streaks.
    pub streaks: Vec<Streak>,
    /// Rewards.
    pub rewards: Vec<Reward>,
    /// Progress records.
    pub progress: Vec<Progress>,
}

impl GamificationSnapshot {
    // =========================================================================
    // Achievements
    // =========================================================================

    /// Achievement by id.
    #[must_use]
    pub fn achievement(&self, id: &AchievementId) -> Option<&Achievement> {
        self.achievements.iter().find(|a| &a.id == id)
    }

    /// Achievements in `category`.
    #[must_use]
    pub fn achievements_by_category(&self, category: &str) -> Vec<&Achievement> {
        self.achievements
            .iter()
            .filter(|a| a.category.as_deref() == Some(category))
            .collect()
    }

    /// Unlocked achievements.
    #[must_use]
    pub fn unlocked_achievements(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| a.unlocked).collect()
    }

    /// Achievements still to unlock.
    #[must_use]
    pub fn locked_achievements(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| !a.unlocked).collect()
    }

    // =========================================================================
    // Streaks
    // =========================================================================

    /// Streak of `streak_type`.
    #[must_use]
    pub fn streak(&self, streak_type: &str) -> Option<&Streak> {
        self.streaks.iter().find(|s| s.streak_type == streak_type)
    }

    /// Streaks with activity inside the active window at `now`.
    #[must_use]
    pub fn active_streaks(&self, now: DateTime<Utc>) -> Vec<&Streak> {
        self.streaks.iter().filter(|s| s.is_active_at(now)).collect()
    }

    /// Best `longest_streak`, over every streak or only those of `streak_type`.
    /// Zero when nothing matches.
    #[must_use]
    pub fn longest_streak(&self, streak_type: Option<&str>) -> u32 {
        self.streaks
            .iter()
            .filter(|s| streak_type.map_or(true, |t| s.streak_type == t))
            .map(|s| s.longest_streak)
            .max()
            .unwrap_or(0)
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    /// Reward by id.
    #[must_use]
    pub fn reward(&self, id: &RewardId) -> Option<&Reward> {
        self.rewards.iter().find(|r| &r.id == id)
    }

    /// Unlocked rewards not yet claimed.
    #[must_use]
    pub fn unlocked_rewards(&self) -> Vec<&Reward> {
        self.rewards
            .iter()
            .filter(|r| r.unlocked && !r.claimed)
            .collect()
    }

    /// Claimed rewards.
    #[must_use]
    pub fn claimed_rewards(&self) -> Vec<&Reward> {
        self.rewards.iter().filter(|r| r.claimed).collect()
    }

    /// Rewards the user could claim at `now`: unclaimed, unexpired, affordable with
    /// the current balance and allowed at the current level.
    #[must_use]
    pub fn available_rewards(&self, now: DateTime<Utc>) -> Vec<&Reward> {
        let balance = self.point_balance.total;
        let level = self.level.current_level;
        self.rewards
            .iter()
            .filter(|r| !r.claimed && !is_reward_expired(r, now))
            .filter(|r| r.points_cost.map_or(true, |cost| cost <= balance))
            .filter(|r| r.level_allows(level))
            .collect()
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Progress record for `metric`.
    #[must_use]
    pub fn progress_for(&self, metric: &str) -> Option<&Progress> {
        self.progress.iter().find(|p| p.metric == metric)
    }

    /// Progress records in `category`.
    #[must_use]
    pub fn progress_by_category(&self, category: &str) -> Vec<&Progress> {
        self.progress
            .iter()
            .filter(|p| p.category.as_deref() == Some(category))
            .collect()
    }

    /// Progress records tracked over `period`.
    #[must_use]
    pub fn progress_by_period(&self, period: Period) -> Vec<&Progress> {
        self.progress
            .iter()
            .filter(|p| p.period == Some(period))
            .collect()
    }
}

/// State container for a single user.
pub struct GamificationSession<'a, S> {
    orchestrator: &'a Orchestrator<S>,
    user_id: UserId,
    snapshot: Option<GamificationSnapshot>,
}

impl<'a, S: KeyValueStore> GamificationSession<'a, S> {
    /// A session for `user_id`. Nothing is loaded until [`Self::initialize`].
    pub fn new(orchestrator: &'a Orchestrator<S>, user_id: UserId) -> Self {
        Self {
            orchestrator,
            user_id,
            snapshot: None,
        }
    }

    /// The session's user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Whether a snapshot has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.snapshot.is_some()
    }

    /// The loaded snapshot.
    pub fn snapshot(&self) -> Option<&GamificationSnapshot> {
        self.snapshot.as_ref()
    }

    /// Load every family for the user.
    ///
    /// # Errors
    ///
    /// Returns the first load failure; the session stays uninitialized.
    pub fn initialize(&mut self) -> Result<&GamificationSnapshot> {
        self.refresh()?;
        tracing::debug!(user_id = %self.user_id, "Session initialized");
        self.loaded()
    }

    /// Reload the snapshot from storage.
    ///
    /// # Errors
    ///
    /// Returns the first load failure; the previous snapshot is kept.
    pub fn refresh(&mut self) -> Result<()> {
        let repo = self.orchestrator.repository();
        let user_id = &self.user_id;
        let snapshot = GamificationSnapshot {
            achievements: repo.load_achievements(user_id)?,
            point_balance: repo.load_point_balance(user_id)?,
            recent_transactions: repo.load_point_transactions(user_id, Some(RECENT_TRANSACTIONS))?,
            level: repo.load_level(user_id)?,
            streaks: repo.load_streaks(user_id)?,
            rewards: repo.load_rewards(user_id)?,
            progress: repo.load_progress(user_id, None)?,
        };
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn loaded(&self) -> Result<&GamificationSnapshot> {
        self.snapshot.as_ref().ok_or_else(|| {
            GamificationError::OperationFailed(format!(
                "session for {} is not initialized",
                self.user_id
            ))
        })
    }

    fn settle<T>(&mut self, outcome: Outcome<T>) -> Result<Outcome<T>> {
        self.refresh()?;
        Ok(outcome)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set achievement progress, unlocking and awarding on completion.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's or the refresh's error.
    pub fn update_achievement_progress(
        &mut self,
        achievement_id: &AchievementId,
        progress: u32,
    ) -> Result<Outcome<Achievement>> {
        let outcome =
            self.orchestrator
                .record_achievement_progress(&self.user_id, achievement_id, progress)?;
        self.settle(outcome)
    }

    /// Unlock an achievement and award its points.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's or the refresh's error.
    pub fn unlock_achievement(
        &mut self,
        achievement_id: &AchievementId,
    ) -> Result<Outcome<Achievement>> {
        let outcome = self
            .orchestrator
            .unlock_achievement(&self.user_id, achievement_id)?;
        self.settle(outcome)
    }

    /// Add points.
    ///
    /// # Errors
    ///
    /// Returns the repository's or the refresh's error.
    pub fn add_points(&mut self, grant: PointGrant) -> Result<Outcome<PointTransaction>> {
        let transaction = self
            .orchestrator
            .repository()
            .add_points(&self.user_id, grant)?;
        let events = vec![GamificationEvent::from_transaction(&transaction)];
        self.settle(Outcome::new(transaction, events))
    }

    /// Deduct points.
    ///
    /// # Errors
    ///
    /// Returns the repository's or the refresh's error.
    pub fn deduct_points(&mut self, grant: PointGrant) -> Result<Outcome<PointTransaction>> {
        let transaction = self
            .orchestrator
            .repository()
            .deduct_points(&self.user_id, grant)?;
        let events = vec![GamificationEvent::from_transaction(&transaction)];
        self.settle(Outcome::new(transaction, events))
    }

    /// Add experience, awarding level-up points.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's or the refresh's error.
    pub fn add_experience(
        &mut self,
        amount: u64,
        source: Option<&str>,
    ) -> Result<Outcome<LevelProgress>> {
        let outcome = self
            .orchestrator
            .add_experience(&self.user_id, amount, source)?;
        self.settle(outcome)
    }

    /// Record streak activity.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's or the refresh's error.
    pub fn update_streak_activity(
        &mut self,
        streak_type: &str,
        activity_date: DateTime<Utc>,
    ) -> Result<Outcome<Streak>> {
        let outcome =
            self.orchestrator
                .record_streak_activity(&self.user_id, streak_type, activity_date)?;
        self.settle(outcome)
    }

    /// Claim a reward, paying its cost.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's or the refresh's error.
    pub fn claim_reward(&mut self, reward_id: &RewardId) -> Result<Outcome<RewardClaim>> {
        let outcome = self.orchestrator.claim_reward(&self.user_id, reward_id)?;
        self.settle(outcome)
    }

    /// Increment a progress metric for the session's user.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the update names another user, or the
    /// orchestrator's or the refresh's error.
    pub fn update_progress(&mut self, update: ProgressUpdate) -> Result<Outcome<Progress>> {
        if update.user_id != self.user_id {
            return Err(GamificationError::InvalidData(format!(
                "progress update for {} sent to the session of {}",
                update.user_id, self.user_id
            )));
        }
        let outcome = self.orchestrator.update_progress(update)?;
        self.settle(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorConfig;
    use chrono::Duration;
    use levelup_core::{AchievementDefinition, RewardDefinition};
    use levelup_store::{GamificationRepository, MemoryStore};

    fn orchestrator() -> Orchestrator<MemoryStore> {
        Orchestrator::new(
            GamificationRepository::new(MemoryStore::new()),
            OrchestratorConfig::default(),
        )
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn initialize_loads_defaults() {
        let o = orchestrator();
        let mut session = GamificationSession::new(&o, user());
        assert!(!session.is_initialized());

        let snapshot = session.initialize().unwrap();
        assert!(snapshot.achievements.is_empty());
        assert_eq!(snapshot.point_balance.total, 0);
        assert_eq!(snapshot.level.current_level, 1);
        assert!(session.is_initialized());
    }

    #[test]
    fn mutations_refresh_snapshot() {
        let o = orchestrator();
        let definition = AchievementDefinition {
            achievement_type: "first".into(),
            title: "First".into(),
            description: "First step".into(),
            icon: None,
            category: None,
            requirement: 1,
            points: Some(15),
            rarity: None,
            metadata: None,
        };
        let achievement = Achievement::from_definition(
            AchievementId::new("first").unwrap(),
            user(),
            &definition,
            Utc::now(),
        );
        o.repository().save_achievements(&[achievement]).unwrap();

        let mut session = GamificationSession::new(&o, user());
        session.initialize().unwrap();
        session
            .update_achievement_progress(&AchievementId::new("first").unwrap(), 1)
            .unwrap();
        session.add_experience(120, Some("lesson")).unwrap();

        let snapshot = session.snapshot().unwrap();
        assert!(snapshot.achievements[0].unlocked);
        assert_eq!(snapshot.level.current_level, 2);
        assert_eq!(snapshot.point_balance.total, 15 + 20);
        assert_eq!(snapshot.recent_transactions.len(), 2);
    }

    #[test]
    fn recent_transactions_are_capped() {
        let o = orchestrator();
        let mut session = GamificationSession::new(&o, user());
        for i in 0..12 {
            session.add_points(PointGrant::new(i, "test")).unwrap();
        }
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.recent_transactions.len(), RECENT_TRANSACTIONS);
        assert_eq!(snapshot.point_balance.total, (0..12).sum::<i64>());
    }

    fn reward(id: &str, cost: Option<i64>, level_required: Option<u32>) -> Reward {
        let definition = RewardDefinition {
            reward_type: "badge".into(),
            title: format!("Reward {id}"),
            description: None,
            icon: None,
            category: None,
            points_cost: cost,
            level_required,
            rarity: None,
            expires_at: None,
            metadata: None,
        };
        Reward::from_definition(RewardId::new(id).unwrap(), user(), &definition, Utc::now())
    }

    fn loaded_snapshot(balance: i64) -> GamificationSnapshot {
        let o = orchestrator();
        let mut session = GamificationSession::new(&o, user());
        session.add_points(PointGrant::new(balance, "test")).unwrap();
        session.snapshot().unwrap().clone()
    }

    #[test]
    fn reward_queries() {
        let now = Utc::now();
        let mut snapshot = loaded_snapshot(50);

        let mut claimed = reward("claimed", Some(10), None);
        claimed.unlocked = true;
        claimed.claimed = true;
        let mut unlocked = reward("unlocked", Some(40), None);
        unlocked.unlocked = true;
        let mut expired = reward("expired", None, None);
        expired.expires_at = Some(now - Duration::hours(1));
        snapshot.rewards = vec![
            claimed,
            unlocked,
            expired,
            reward("too-expensive", Some(60), None),
            reward("too-high", None, Some(3)),
            reward("free", None, Some(1)),
        ];

        let ids = |rewards: Vec<&Reward>| -> Vec<String> {
            rewards.iter().map(|r| r.id.to_string()).collect()
        };
        assert_eq!(ids(snapshot.available_rewards(now)), vec!["unlocked", "free"]);
        assert_eq!(ids(snapshot.unlocked_rewards()), vec!["unlocked"]);
        assert_eq!(ids(snapshot.claimed_rewards()), vec!["claimed"]);
        assert!(snapshot.reward(&RewardId::new("free").unwrap()).is_some());
    }

    #[test]
    fn streak_queries() {
        let now = Utc::now();
        let mut snapshot = loaded_snapshot(0);
        assert_eq!(snapshot.longest_streak(None), 0);

        let mut daily = Streak::start(user(), "daily_login", now, now);
        daily.longest_streak = 9;
        let mut lessons = Streak::start(user(), "lessons", now - Duration::hours(30), now);
        lessons.longest_streak = 4;
        snapshot.streaks = vec![daily, lessons];

        let active = snapshot.active_streaks(now);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].streak_type, "daily_login");
        assert_eq!(snapshot.longest_streak(None), 9);
        assert_eq!(snapshot.longest_streak(Some("lessons")), 4);
        assert_eq!(snapshot.longest_streak(Some("missing")), 0);
        assert!(snapshot.streak("lessons").is_some());
    }

    #[test]
    fn achievement_and_progress_queries() {
        let o = orchestrator();
        let definition = |category: &str| AchievementDefinition {
            achievement_type: "goals".into(),
            title: "Goals".into(),
            description: "Goals".into(),
            icon: None,
            category: Some(category.into()),
            requirement: 1,
            points: None,
            rarity: None,
            metadata: None,
        };
        let achievements: Vec<Achievement> = [("a", "social"), ("b", "learning")]
            .iter()
            .map(|(id, category)| {
                Achievement::from_definition(
                    AchievementId::new(*id).unwrap(),
                    user(),
                    &definition(*category),
                    Utc::now(),
                )
            })
            .collect();
        o.repository().save_achievements(&achievements).unwrap();

        let mut session = GamificationSession::new(&o, user());
        session.initialize().unwrap();
        session
            .unlock_achievement(&AchievementId::new("a").unwrap())
            .unwrap();

        let mut weekly = ProgressUpdate::new(user(), "minutes", 30.0);
        weekly.category = Some("learning".into());
        weekly.period = Some(Period::Weekly);
        session.update_progress(weekly).unwrap();
        session
            .update_progress(ProgressUpdate::new(user(), "sessions", 1.0))
            .unwrap();

        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.unlocked_achievements()[0].id.as_str(), "a");
        assert_eq!(snapshot.locked_achievements()[0].id.as_str(), "b");
        assert_eq!(snapshot.achievements_by_category("learning").len(), 1);
        assert_eq!(snapshot.progress_by_category("learning")[0].metric, "minutes");
        assert_eq!(snapshot.progress_by_period(Period::Weekly).len(), 1);
        assert!(snapshot.progress_by_period(Period::Daily).is_empty());
        assert!(snapshot.progress_for("sessions").is_some());
    }

    #[test]
    fn progress_for_other_user_is_rejected() {
        let o = orchestrator();
        let mut session = GamificationSession::new(&o, user());
        let update = ProgressUpdate::new(UserId::new("user-2").unwrap(), "sessions", 1.0);
        let err = session.update_progress(update).unwrap_err();
        assert_eq!(err.code(), levelup_core::ErrorCode::InvalidData);
    }
}
