//! Per-metric progress counters.
//!
//! One live record per `(user, metric)`. The percentage is recomputed from the
//! running value whenever a target is set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GamificationError, Period, ProgressId, Result, UserId};

/// A running counter for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Record identifier.
    pub id: ProgressId,

    /// The user.
    pub user_id: UserId,

    /// Metric identifier (e.g. `goals_completed`).
    pub metric: String,

    /// Accumulated value.
    pub current_value: f64,

    /// Optional target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,

    /// Percentage towards the target (0-100). Zero without a target.
    pub progress: u8,

    /// Unit of measurement (e.g. `times`, `hours`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Period covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    /// Start of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,

    /// End of the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,

    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// When the record was created.
    pub created_date: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_date: DateTime<Utc>,
}

impl Progress {
    /// The first record for `(update.user_id, update.metric)`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the increment or the target is not finite.
    pub fn start(update: ProgressUpdate, now: DateTime<Utc>) -> Result<Self> {
        update.validate()?;
        let mut progress = Self {
            id: ProgressId::generate(),
            user_id: update.user_id,
            metric: update.metric,
            current_value: update.increment,
            target_value: update.target_value,
            progress: 0,
            unit: None,
            category: update.category,
            period: update.period,
            period_start: None,
            period_end: None,
            metadata: update.metadata,
            created_date: now,
            updated_date: now,
        };
        progress.recompute();
        Ok(progress)
    }

    /// Add the update's increment to the running value.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the increment, the target or the new total is not
    /// finite. The record is left untouched.
    pub fn apply(&mut self, update: &ProgressUpdate, now: DateTime<Utc>) -> Result<()> {
        update.validate()?;
        let value = self.current_value + update.increment;
        if !value.is_finite() {
            return Err(GamificationError::InvalidData(format!(
                "progress for {} overflows",
                self.metric
            )));
        }
        self.current_value = value;
        if update.target_value.is_some() {
            self.target_value = update.target_value;
        }
        self.recompute();
        self.updated_date = now;
        Ok(())
    }

    /// Milestones in `milestones` for this metric that the value has reached.
    #[must_use]
    pub fn reached_milestones<'a>(
        &self,
        milestones: &'a [ProgressMilestone],
    ) -> Vec<&'a ProgressMilestone> {
        milestones
            .iter()
            .filter(|m| m.metric == self.metric && self.current_value >= m.value)
            .collect()
    }

    fn recompute(&mut self) {
        if let Some(target) = self.target_value {
            self.progress = progress_percent(self.current_value, target);
        }
    }
}

/// An increment for a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// The user.
    pub user_id: UserId,
    /// Metric identifier.
    pub metric: String,
    /// Amount to add.
    pub increment: f64,
    /// Category for a new record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Period for a new record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    /// Target to set or replace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    /// Free-form host application data for a new record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ProgressUpdate {
    /// Increment `metric` by `increment`.
    pub fn new(user_id: UserId, metric: impl Into<String>, increment: f64) -> Self {
        Self {
            user_id,
            metric: metric.into(),
            increment,
            category: None,
            period: None,
            target_value: None,
            metadata: None,
        }
    }

    /// Set or replace the target.
    #[must_use]
    pub fn with_target(mut self, target_value: f64) -> Self {
        self.target_value = Some(target_value);
        self
    }

    /// Reject increments and targets that cannot be stored as JSON numbers.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` on a NaN or infinite value.
    pub fn validate(&self) -> Result<()> {
        if !self.increment.is_finite() {
            return Err(GamificationError::InvalidData(format!(
                "increment for {} must be finite",
                self.metric
            )));
        }
        if self.target_value.is_some_and(|t| !t.is_finite()) {
            return Err(GamificationError::InvalidData(format!(
                "target for {} must be finite",
                self.metric
            )));
        }
        Ok(())
    }
}

/// A named threshold on a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMilestone {
    /// Metric identifier.
    pub metric: String,
    /// Value at which the milestone is reached.
    pub value: f64,
    /// Display title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reward id or type granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// `min(100, round(current / target * 100))`; zero for a non-positive target.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn progress_percent(current: f64, target: f64) -> u8 {
    if target <= 0.0 {
        return 0;
    }
    (current / target * 100.0).round().clamp(0.0, 100.0) as u8
}
