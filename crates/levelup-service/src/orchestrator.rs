//! Effect chains across entity families.
//!
//! The repository mutates one collection per call. The [`Orchestrator`] composes those
//! calls into the chains the application relies on and reports every effect as a
//! [`GamificationEvent`]:
//!
//! - achievement progress reaching the requirement unlocks the achievement
//! - unlocking an achievement awards its points
//! - a level-up awards `level * level_up_points_per_level` points
//! - a streak reaching a milestone awards the milestone points (opt-in)
//! - claiming a reward checks expiry, level and balance, then pays and claims

use chrono::{DateTime, Utc};
use serde::Serialize;

use levelup_core::{
    find_user_rank, is_reward_expired, milestone_at, rank_change, Achievement, AchievementId,
    GamificationError, LeaderboardEntry, LeaderboardId, LevelProgress, PointGrant,
    PointTransaction, Progress, ProgressUpdate, RankChange, Result, RewardClaim, RewardId, Streak,
    StreakTransition, TransactionId, UserId,
};
use levelup_store::{GamificationRepository, KeyValueStore};

/// Points per level awarded on level-up when nothing else is configured.
pub const DEFAULT_LEVEL_UP_POINTS_PER_LEVEL: i64 = 10;

/// Rules applied by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Points per reached level awarded on level-up. Zero disables the award.
    pub level_up_points_per_level: i64,

    /// Award milestone points when a streak reaches a milestone.
    pub streak_milestone_rewards: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            level_up_points_per_level: DEFAULT_LEVEL_UP_POINTS_PER_LEVEL,
            streak_milestone_rewards: false,
        }
    }
}

/// Something that happened while running an effect chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum GamificationEvent {
    /// Achievement progress changed.
    ProgressUpdated {
        /// The achievement.
        achievement_id: AchievementId,
        /// New progress.
        progress: u32,
        /// Its requirement.
        requirement: u32,
    },
    /// An achievement was unlocked.
    AchievementUnlocked {
        /// The achievement.
        achievement_id: AchievementId,
        /// Its title.
        title: String,
        /// Points it carries.
        points: Option<i64>,
    },
    /// Points were added to the ledger.
    PointsAwarded {
        /// The ledger entry.
        transaction_id: TransactionId,
        /// Amount added.
        amount: i64,
        /// Balance afterwards.
        balance: i64,
        /// Origin of the award.
        source: String,
    },
    /// Points were removed from the ledger.
    PointsDeducted {
        /// The ledger entry.
        transaction_id: TransactionId,
        /// Amount removed (positive).
        amount: i64,
        /// Balance afterwards.
        balance: i64,
        /// Origin of the deduction.
        source: String,
    },
    /// The user reached a new level.
    LevelUp {
        /// Level before the experience gain.
        previous_level: u32,
        /// Level after it.
        new_level: u32,
    },
    /// A streak recorded an activity.
    StreakUpdated {
        /// Streak type.
        streak_type: String,
        /// Count after the activity.
        current_streak: u32,
        /// Longest count.
        longest_streak: u32,
        /// What the activity did.
        transition: StreakTransition,
    },
    /// A reward was claimed.
    RewardClaimed {
        /// The reward.
        reward_id: RewardId,
        /// Points paid.
        points_spent: Option<i64>,
    },
    /// A progress metric changed.
    ProgressRecorded {
        /// Metric identifier.
        metric: String,
        /// Value afterwards.
        current_value: f64,
        /// Percentage afterwards.
        progress: u8,
    },
}

impl GamificationEvent {
    pub(crate) fn from_transaction(transaction: &PointTransaction) -> Self {
        if transaction.is_debit() {
            Self::PointsDeducted {
                transaction_id: transaction.id.clone(),
                amount: -transaction.amount,
                balance: transaction.balance,
                source: transaction.source.clone(),
            }
        } else {
            Self::PointsAwarded {
                transaction_id: transaction.id.clone(),
                amount: transaction.amount,
                balance: transaction.balance,
                source: transaction.source.clone(),
            }
        }
    }
}

/// A result together with the events produced on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    /// The primary result.
    pub value: T,
    /// Effects, in the order they happened.
    pub events: Vec<GamificationEvent>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(value: T, events: Vec<GamificationEvent>) -> Self {
        Self { value, events }
    }
}

/// Result of submitting a leaderboard score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    /// The stored entry with its rank.
    pub entry: LeaderboardEntry,
    /// Rank before the submission, if the user was ranked.
    pub previous_rank: Option<u32>,
    /// Movement relative to the previous rank.
    pub change: RankChange,
}

/// Composes repository calls into effect chains.
#[derive(Debug, Clone)]
pub struct Orchestrator<S> {
    repository: GamificationRepository<S>,
    config: OrchestratorConfig,
}

impl<S: KeyValueStore> Orchestrator<S> {
    /// Orchestrate calls against `repository`.
    pub fn new(repository: GamificationRepository<S>, config: OrchestratorConfig) -> Self {
        Self { repository, config }
    }

    /// The wrapped repository.
    pub fn repository(&self) -> &GamificationRepository<S> {
        &self.repository
    }

    /// The rules in use.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // =========================================================================
    // Achievements
    // =========================================================================

    /// Set progress; unlock and award points once the requirement is reached.
    ///
    /// # Errors
    ///
    /// Returns the first failing repository call. Earlier writes are kept.
    pub fn record_achievement_progress(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
        progress: u32,
    ) -> Result<Outcome<Achievement>> {
        let updated =
            self.repository
                .update_achievement_progress(user_id, achievement_id, progress)?;
        let mut events = vec![GamificationEvent::ProgressUpdated {
            achievement_id: updated.id.clone(),
            progress: updated.progress,
            requirement: updated.requirement,
        }];

        if !updated.is_pending_unlock() {
            return Ok(Outcome::new(updated, events));
        }
        let unlocked = self.unlock_and_award(user_id, achievement_id, &mut events)?;
        Ok(Outcome::new(unlocked, events))
    }

    /// Unlock an achievement and award its points.
    ///
    /// Unlocking an already unlocked achievement changes nothing and awards nothing.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` for an unknown achievement, or a storage error.
    pub fn unlock_achievement(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
    ) -> Result<Outcome<Achievement>> {
        let current = self.repository.get_achievement(user_id, achievement_id)?;
        if current.unlocked {
            return Ok(Outcome::new(current, Vec::new()));
        }
        let mut events = Vec::new();
        let unlocked = self.unlock_and_award(user_id, achievement_id, &mut events)?;
        Ok(Outcome::new(unlocked, events))
    }

    fn unlock_and_award(
        &self,
        user_id: &UserId,
        achievement_id: &AchievementId,
        events: &mut Vec<GamificationEvent>,
    ) -> Result<Achievement> {
        let unlocked = self.repository.unlock_achievement(user_id, achievement_id)?;
        events.push(GamificationEvent::AchievementUnlocked {
            achievement_id: unlocked.id.clone(),
            title: unlocked.title.clone(),
            points: unlocked.points,
        });

        if let Some(points) = unlocked.points.filter(|p| *p > 0) {
            let grant = PointGrant::new(points, "achievement")
                .with_source_id(achievement_id.as_str())
                .with_category("achievement")
                .with_description(format!("Unlocked achievement: {}", unlocked.title));
            let transaction = self.repository.add_points(user_id, grant)?;
            events.push(GamificationEvent::from_transaction(&transaction));
        }
        Ok(unlocked)
    }

    // =========================================================================
    // Levels
    // =========================================================================

    /// Add experience; on level-up award points for the reached level.
    ///
    /// # Errors
    ///
    /// Returns the first failing repository call. Earlier writes are kept.
    pub fn add_experience(
        &self,
        user_id: &UserId,
        amount: u64,
        source: Option<&str>,
    ) -> Result<Outcome<LevelProgress>> {
        let previous_level = self.repository.load_level(user_id)?.current_level;
        let progress = self.repository.add_experience(user_id, amount, source)?;
        let mut events = Vec::new();

        if progress.can_level_up {
            events.push(GamificationEvent::LevelUp {
                previous_level,
                new_level: progress.current_level,
            });

            let award = i64::from(progress.current_level)
                .saturating_mul(self.config.level_up_points_per_level);
            if award > 0 {
                let grant = PointGrant::new(award, "level_up")
                    .with_category("level")
                    .with_description(format!("Leveled up to level {}", progress.current_level));
                let transaction = self.repository.add_points(user_id, grant)?;
                events.push(GamificationEvent::from_transaction(&transaction));
            }
        }
        Ok(Outcome::new(progress, events))
    }

    // =========================================================================
    // Streaks
    // =========================================================================

    /// Record streak activity; award milestone points when enabled.
    ///
    /// # Errors
    ///
    /// Returns the first failing repository call. Earlier writes are kept.
    pub fn record_streak_activity(
        &self,
        user_id: &UserId,
        streak_type: &str,
        activity_date: DateTime<Utc>,
    ) -> Result<Outcome<Streak>> {
        let (streak, transition) =
            self.repository
                .update_streak_activity(user_id, streak_type, activity_date)?;
        let mut events = vec![GamificationEvent::StreakUpdated {
            streak_type: streak.streak_type.clone(),
            current_streak: streak.current_streak,
            longest_streak: streak.longest_streak,
            transition,
        }];

        let milestone = milestone_at(streak.current_streak)
            .filter(|_| self.config.streak_milestone_rewards)
            .filter(|_| transition == StreakTransition::Continued);
        if let Some(milestone) = milestone {
            tracing::info!(
                user_id = %user_id,
                streak_type,
                days = milestone.days,
                tier = ?milestone.tier,
                "Streak milestone reached"
            );
            let grant = PointGrant::new(milestone.points, "streak_milestone")
                .with_source_id(streak.id.as_str())
                .with_category("streak")
                .with_description(format!(
                    "Reached a {}-day {} streak",
                    milestone.days, streak.streak_type
                ));
            let transaction = self.repository.add_points(user_id, grant)?;
            events.push(GamificationEvent::from_transaction(&transaction));
        }
        Ok(Outcome::new(streak, events))
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    /// Claim a reward, paying its cost from the point balance.
    ///
    /// Checks run before anything is written: the reward must exist, be unclaimed and
    /// not expired, the user's level must meet the requirement and the balance must
    /// cover the cost. If the claim write fails after the cost was deducted, a refund
    /// transaction is recorded and the claim error is returned.
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND`: unknown reward
    /// - `INVALID_DATA`: already claimed or expired
    /// - `OPERATION_FAILED`: level too low or insufficient points
    /// - storage errors from any step
    pub fn claim_reward(
        &self,
        user_id: &UserId,
        reward_id: &RewardId,
    ) -> Result<Outcome<RewardClaim>> {
        let reward = self.repository.get_reward(user_id, reward_id)?;
        if reward.claimed {
            return Err(GamificationError::InvalidData(format!(
                "reward {reward_id} already claimed"
            )));
        }
        if is_reward_expired(&reward, Utc::now()) {
            return Err(GamificationError::InvalidData(format!(
                "reward {reward_id} has expired"
            )));
        }
        if let Some(required) = reward.level_required {
            let level = self.repository.load_level(user_id)?;
            if !reward.level_allows(level.current_level) {
                return Err(GamificationError::OperationFailed(format!(
                    "reward {reward_id} requires level {required}, user is level {}",
                    level.current_level
                )));
            }
        }

        let mut events = Vec::new();
        let cost = reward.points_cost.filter(|c| *c > 0);
        if let Some(cost) = cost {
            let balance = self.repository.load_point_balance(user_id)?;
            if !balance.has_sufficient_points(cost) {
                return Err(GamificationError::OperationFailed(format!(
                    "insufficient points: balance={}, required={cost}",
                    balance.total
                )));
            }
            let grant = PointGrant::new(cost, "reward_claim")
                .with_source_id(reward_id.as_str())
                .with_description(format!("Claimed reward: {}", reward.title));
            let transaction = self.repository.deduct_points(user_id, grant)?;
            events.push(GamificationEvent::from_transaction(&transaction));
        }

        let claim = match self.repository.claim_reward(user_id, reward_id) {
            Ok(claim) => claim,
            Err(err) => {
                if let Some(cost) = cost {
                    self.refund(user_id, reward_id, &reward.title, cost);
                }
                return Err(err);
            }
        };
        events.push(GamificationEvent::RewardClaimed {
            reward_id: reward_id.clone(),
            points_spent: claim.points_spent,
        });
        Ok(Outcome::new(claim, events))
    }

    fn refund(&self, user_id: &UserId, reward_id: &RewardId, title: &str, cost: i64) {
        let grant = PointGrant::new(cost, "reward_refund")
            .with_source_id(reward_id.as_str())
            .with_description(format!("Refund for reward: {title}"));
        match self.repository.add_points(user_id, grant) {
            Ok(_) => tracing::warn!(
                user_id = %user_id,
                reward_id = %reward_id,
                cost,
                "Reward claim failed after payment, cost refunded"
            ),
            Err(e) => tracing::error!(
                user_id = %user_id,
                reward_id = %reward_id,
                cost,
                error = %e,
                "Reward claim failed after payment and the refund could not be recorded"
            ),
        }
    }

    // =========================================================================
    // Progress
    // =========================================================================

    /// Increment a progress metric.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn update_progress(&self, update: ProgressUpdate) -> Result<Outcome<Progress>> {
        let progress = self.repository.update_progress(update)?;
        let events = vec![GamificationEvent::ProgressRecorded {
            metric: progress.metric.clone(),
            current_value: progress.current_value,
            progress: progress.progress,
        }];
        Ok(Outcome::new(progress, events))
    }

    // =========================================================================
    // Leaderboards
    // =========================================================================

    /// Set a user's score, reusing the user's existing entry when there is one.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn submit_score(
        &self,
        leaderboard_id: &LeaderboardId,
        user_id: &UserId,
        score: i64,
        display_name: Option<String>,
    ) -> Result<ScoreSubmission> {
        let leaderboard = self.repository.load_leaderboard(leaderboard_id, None, None)?;
        let previous_rank = find_user_rank(&leaderboard.entries, user_id);
        let now = Utc::now();

        let entry = match leaderboard.entries.into_iter().find(|e| &e.user_id == user_id) {
            Some(mut existing) => {
                existing.score = score;
                existing.updated_date = now;
                if display_name.is_some() {
                    existing.display_name = display_name;
                }
                existing
            }
            None => {
                let mut entry = LeaderboardEntry::new(
                    leaderboard_id.clone(),
                    user_id.clone(),
                    score,
                    leaderboard.metric,
                    now,
                );
                entry.display_name = display_name;
                entry
            }
        };

        let entry = self.repository.update_leaderboard_entry(entry)?;
        Ok(ScoreSubmission {
            change: rank_change(previous_rank, entry.rank),
            previous_rank,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use levelup_core::{AchievementDefinition, ErrorCode, Reward, RewardDefinition};
    use levelup_store::{MemoryStore, StoreError};

    fn orchestrator() -> Orchestrator<MemoryStore> {
        Orchestrator::new(
            GamificationRepository::new(MemoryStore::new()),
            OrchestratorConfig::default(),
        )
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn seed_achievement<S: KeyValueStore>(o: &Orchestrator<S>, id: &str, requirement: u32) {
        let definition = AchievementDefinition {
            achievement_type: "goals".into(),
            title: "Goal Getter".into(),
            description: "Complete goals".into(),
            icon: None,
            category: None,
            requirement,
            points: Some(40),
            rarity: None,
            metadata: None,
        };
        let achievement = Achievement::from_definition(
            AchievementId::new(id).unwrap(),
            user(),
            &definition,
            Utc::now(),
        );
        o.repository().save_achievements(&[achievement]).unwrap();
    }

    fn seed_reward<S: KeyValueStore>(
        o: &Orchestrator<S>,
        id: &str,
        cost: Option<i64>,
        level_required: Option<u32>,
    ) -> RewardId {
        let definition = RewardDefinition {
            reward_type: "badge".into(),
            title: "Badge".into(),
            description: None,
            icon: None,
            category: None,
            points_cost: cost,
            level_required,
            rarity: None,
            expires_at: None,
            metadata: None,
        };
        let reward = Reward::from_definition(RewardId::new(id).unwrap(), user(), &definition, Utc::now());
        o.repository().save_reward(&reward).unwrap();
        reward.id
    }

    fn award<S: KeyValueStore>(o: &Orchestrator<S>, amount: i64) {
        o.repository()
            .add_points(&user(), PointGrant::new(amount, "test"))
            .unwrap();
    }

    // =========================================================================
    // Achievements
    // =========================================================================

    #[test]
    fn progress_below_requirement_only_updates() {
        let o = orchestrator();
        seed_achievement(&o, "a", 10);
        let id = AchievementId::new("a").unwrap();

        let outcome = o.record_achievement_progress(&user(), &id, 4).unwrap();
        assert!(!outcome.value.unlocked);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 0);
    }

    #[test]
    fn reaching_requirement_unlocks_and_awards() {
        let o = orchestrator();
        seed_achievement(&o, "a", 10);
        let id = AchievementId::new("a").unwrap();

        let outcome = o.record_achievement_progress(&user(), &id, 12).unwrap();
        assert!(outcome.value.unlocked);
        assert_eq!(outcome.value.progress, 10);
        assert!(matches!(
            outcome.events[1],
            GamificationEvent::AchievementUnlocked { .. }
        ));
        assert!(matches!(
            outcome.events[2],
            GamificationEvent::PointsAwarded { amount: 40, .. }
        ));

        let stored = o.repository().get_achievement(&user(), &id).unwrap();
        assert_eq!(stored.unlocked, stored.progress >= stored.requirement);

        let ledger = o.repository().load_point_transactions(&user(), None).unwrap();
        assert_eq!(ledger[0].source, "achievement");
        assert_eq!(ledger[0].category.as_deref(), Some("achievement"));
        assert_eq!(ledger[0].description.as_deref(), Some("Unlocked achievement: Goal Getter"));
    }

    #[test]
    fn unlocking_twice_awards_once() {
        let o = orchestrator();
        seed_achievement(&o, "a", 10);
        let id = AchievementId::new("a").unwrap();

        o.unlock_achievement(&user(), &id).unwrap();
        let again = o.unlock_achievement(&user(), &id).unwrap();
        assert!(again.events.is_empty());
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 40);
    }

    #[test]
    fn award_that_overflows_the_balance_is_rejected() {
        let o = orchestrator();
        seed_achievement(&o, "a", 10);
        award(&o, i64::MAX);
        let id = AchievementId::new("a").unwrap();

        let err = o.unlock_achievement(&user(), &id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
        assert_eq!(o.repository().load_point_transactions(&user(), None).unwrap().len(), 1);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, i64::MAX);
    }

    // =========================================================================
    // Levels
    // =========================================================================

    #[test]
    fn level_up_awards_level_points() {
        let o = orchestrator();
        let outcome = o.add_experience(&user(), 250, Some("quiz")).unwrap();
        assert_eq!(outcome.value.current_level, 3);
        assert_eq!(
            outcome.events[0],
            GamificationEvent::LevelUp {
                previous_level: 1,
                new_level: 3
            }
        );

        let balance = o.repository().load_point_balance(&user()).unwrap();
        assert_eq!(balance.total, 30);
        assert_eq!(balance.by_category.get("level"), Some(&30));

        let quiet = o.add_experience(&user(), 10, None).unwrap();
        assert!(quiet.events.is_empty());
    }

    #[test]
    fn level_up_award_is_configurable() {
        let o = Orchestrator::new(
            GamificationRepository::new(MemoryStore::new()),
            OrchestratorConfig {
                level_up_points_per_level: 0,
                ..OrchestratorConfig::default()
            },
        );
        let outcome = o.add_experience(&user(), 100, None).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 0);
    }

    // =========================================================================
    // Streaks
    // =========================================================================

    fn seven_day_streak<S: KeyValueStore>(o: &Orchestrator<S>) -> Outcome<Streak> {
        let start = Utc::now() - Duration::days(20);
        let mut last = None;
        for day in 0..7 {
            last = Some(
                o.record_streak_activity(&user(), "daily", start + Duration::days(day))
                    .unwrap(),
            );
        }
        last.unwrap()
    }

    #[test]
    fn streak_milestones_are_off_by_default() {
        let o = orchestrator();
        let outcome = seven_day_streak(&o);
        assert_eq!(outcome.value.current_streak, 7);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 0);
    }

    #[test]
    fn streak_milestone_award_when_enabled() {
        let o = Orchestrator::new(
            GamificationRepository::new(MemoryStore::new()),
            OrchestratorConfig {
                streak_milestone_rewards: true,
                ..OrchestratorConfig::default()
            },
        );
        let outcome = seven_day_streak(&o);
        assert!(matches!(
            outcome.events[1],
            GamificationEvent::PointsAwarded { amount: 50, .. }
        ));
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 50);
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    #[test]
    fn claim_pays_then_claims() {
        let o = orchestrator();
        award(&o, 100);
        let id = seed_reward(&o, "r", Some(60), None);

        let outcome = o.claim_reward(&user(), &id).unwrap();
        assert_eq!(outcome.value.points_spent, Some(60));
        assert!(matches!(
            outcome.events[0],
            GamificationEvent::PointsDeducted { amount: 60, balance: 40, .. }
        ));
        assert!(matches!(outcome.events[1], GamificationEvent::RewardClaimed { .. }));
        assert!(o.repository().get_reward(&user(), &id).unwrap().claimed);
    }

    #[test]
    fn claim_with_insufficient_points_changes_nothing() {
        let o = orchestrator();
        award(&o, 20);
        let id = seed_reward(&o, "r", Some(60), None);

        let err = o.claim_reward(&user(), &id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationFailed);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 20);
        assert!(!o.repository().get_reward(&user(), &id).unwrap().claimed);
    }

    #[test]
    fn claim_checks_level_and_expiry() {
        let o = orchestrator();
        let gated = seed_reward(&o, "gated", None, Some(2));
        let err = o.claim_reward(&user(), &gated).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationFailed);

        o.add_experience(&user(), 100, None).unwrap();
        o.claim_reward(&user(), &gated).unwrap();

        let mut expired = o
            .repository()
            .get_reward(&user(), &seed_reward(&o, "old", None, None))
            .unwrap();
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        o.repository().save_reward(&expired).unwrap();
        let err = o.claim_reward(&user(), &expired.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
    }

    #[test]
    fn second_claim_is_invalid_and_not_charged() {
        let o = orchestrator();
        award(&o, 100);
        let id = seed_reward(&o, "r", Some(30), None);
        o.claim_reward(&user(), &id).unwrap();

        let err = o.claim_reward(&user(), &id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 70);
    }

    /// Fails writes to keys containing `:rewards:` so the claim fails after payment.
    struct RewardWriteFails(MemoryStore);

    impl KeyValueStore for RewardWriteFails {
        fn get(&self, key: &str) -> levelup_store::Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> levelup_store::Result<()> {
            if key.contains(":rewards:") && self.0.get(key)?.is_some() {
                return Err(StoreError::Database("rewards unavailable".into()));
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> levelup_store::Result<()> {
            self.0.remove(key)
        }
    }

    #[test]
    fn failed_claim_after_payment_is_refunded() {
        let o = Orchestrator::new(
            GamificationRepository::new(RewardWriteFails(MemoryStore::new())),
            OrchestratorConfig::default(),
        );
        award(&o, 100);
        let id = seed_reward(&o, "r", Some(60), None);

        let err = o.claim_reward(&user(), &id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SaveFailed);

        let ledger = o.repository().load_point_transactions(&user(), None).unwrap();
        assert_eq!(ledger[0].source, "reward_refund");
        assert_eq!(ledger[0].amount, 60);
        assert_eq!(o.repository().load_point_balance(&user()).unwrap().total, 100);
    }

    // =========================================================================
    // Progress and leaderboards
    // =========================================================================

    #[test]
    fn progress_emits_event() {
        let o = orchestrator();
        let outcome = o
            .update_progress(ProgressUpdate::new(user(), "sessions", 3.0).with_target(4.0))
            .unwrap();
        assert_eq!(outcome.value.progress, 75);
        assert!(matches!(
            outcome.events[0],
            GamificationEvent::ProgressRecorded { progress: 75, .. }
        ));
    }

    #[test]
    fn submit_score_reuses_entry_and_reports_movement() {
        let o = orchestrator();
        let board = LeaderboardId::new("weekly").unwrap();
        let other = UserId::new("user-2").unwrap();

        let first = o.submit_score(&board, &user(), 10, None).unwrap();
        assert_eq!(first.change, RankChange::New);
        o.submit_score(&board, &other, 20, None).unwrap();

        let moved = o
            .submit_score(&board, &user(), 30, Some("Ada".into()))
            .unwrap();
        assert_eq!(moved.previous_rank, Some(2));
        assert_eq!(moved.entry.rank, 1);
        assert_eq!(moved.change, RankChange::Up);
        assert_eq!(moved.entry.id, first.entry.id);
        assert_eq!(moved.entry.display_name.as_deref(), Some("Ada"));

        let board = o.repository().load_leaderboard(&board, None, None).unwrap();
        assert_eq!(board.total_participants, 2);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = GamificationEvent::LevelUp {
            previous_level: 1,
            new_level: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "level_up");
        assert_eq!(json["previousLevel"], 1);
        assert_eq!(json["newLevel"], 2);
    }
}
