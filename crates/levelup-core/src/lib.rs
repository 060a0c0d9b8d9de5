//! Core types and progression rules for levelup.
//!
//! This crate holds the records and the pure rules used throughout levelup:
//!
//! - **Identifiers**: `UserId`, `AchievementId`, `RewardId`, ...
//! - **Achievements**: `Achievement`, `Rarity`, completion percentage
//! - **Points**: `PointTransaction`, `PointBalance`, `PointGrant`
//! - **Levels**: `Level`, the linear XP law and the sqrt point-tier law
//! - **Streaks**: `Streak`, day-based continuation, milestone table
//! - **Leaderboards**: `Leaderboard`, ranking and percentile
//! - **Rewards**: `Reward`, one-time claims
//! - **Progress**: `Progress`, per-metric counters
//!
//! Nothing here touches storage. Every function takes the current time as an
//! argument so that results are reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod achievement;
pub mod error;
pub mod ids;
pub mod leaderboard;
pub mod level;
pub mod points;
pub mod progress;
pub mod reward;
pub mod streak;

pub use achievement::{
    calculate_achievement_progress, is_achievement_complete, points_for_rarity, Achievement,
    AchievementDefinition, AchievementProgress, Rarity,
};
pub use error::{ErrorCode, GamificationError, Result};
pub use ids::{
    AchievementId, ClaimId, EntryId, IdError, LeaderboardId, LevelId, ProgressId, RewardId,
    StreakId, TransactionId, UserId,
};
pub use leaderboard::{
    find_user_rank, percentile, rank_change, top_entries, Leaderboard, LeaderboardEntry,
    LeaderboardRanking, Period, RankChange,
};
pub use level::{
    add_experience, level_from_experience_linear, level_from_points_sqrt,
    points_for_next_sqrt_level, Level, LevelDefinition, LevelProgress, XP_PER_LEVEL,
};
pub use points::{ledger_total, PointBalance, PointGrant, PointTransaction};
pub use progress::{progress_percent, Progress, ProgressMilestone, ProgressUpdate};
pub use reward::{is_reward_expired, Reward, RewardClaim, RewardDefinition};
pub use streak::{
    achieved_milestones, elapsed_days, milestone_at, next_milestone, MilestoneTier, Streak,
    StreakDefinition, StreakMilestone, StreakProgress, StreakTransition, ACTIVE_WINDOW_HOURS,
    BREAK_AFTER_HOURS, STREAK_MILESTONES,
};
