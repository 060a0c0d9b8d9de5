//! Point ledger types.
//!
//! Every balance change is recorded as a [`PointTransaction`]. The ledger is
//! append-only and kept newest-first; balances are always derived from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GamificationError, Result, TransactionId, UserId};

/// A single balance change in a user's point ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    /// Unique transaction ID.
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed amount. Positive = award, negative = deduction.
    pub amount: i64,

    /// Where the points came from (e.g. `achievement`, `level_up`, `reward_claim`).
    pub source: String,

    /// Identifier of the source record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Category used for the per-category balance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Balance after this transaction.
    pub balance: i64,

    /// Free-form host application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// When the transaction was created.
    pub created_date: DateTime<Utc>,
}

impl PointTransaction {
    /// Record a grant on top of `prior_total`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the new balance does not fit in an `i64`.
    pub fn record(
        user_id: UserId,
        grant: PointGrant,
        prior_total: i64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let balance = prior_total.checked_add(grant.amount).ok_or_else(|| {
            GamificationError::InvalidData(format!(
                "adding {} to a balance of {prior_total} overflows",
                grant.amount
            ))
        })?;
        Ok(Self {
            id: TransactionId::generate(),
            user_id,
            amount: grant.amount,
            source: grant.source,
            source_id: grant.source_id,
            category: grant.category,
            description: grant.description,
            balance,
            metadata: None,
            created_date: now,
        })
    }

    /// Whether the transaction added points.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        self.amount > 0
    }

    /// Whether the transaction removed points.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Input for a ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointGrant {
    /// Signed amount to record.
    pub amount: i64,
    /// Where the points came from.
    pub source: String,
    /// Identifier of the source record.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Category for the per-category balance.
    #[serde(default)]
    pub category: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

impl PointGrant {
    /// A grant of `amount` points from `source`.
    pub fn new(amount: i64, source: impl Into<String>) -> Self {
        Self {
            amount,
            source: source.into(),
            source_id: None,
            category: None,
            description: None,
        }
    }

    /// Attach the id of the source record.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Attach a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The same grant with its amount negated and its category dropped.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` for `i64::MIN`, which has no negation.
    pub fn into_deduction(self) -> Result<Self> {
        let amount = self.amount.checked_neg().ok_or_else(|| {
            GamificationError::InvalidData(format!("cannot deduct {} points", self.amount))
        })?;
        Ok(Self {
            amount,
            category: None,
            ..self
        })
    }
}

/// A user's balance, derived from the full ledger on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointBalance {
    /// The user.
    pub user_id: UserId,
    /// Sum of all transaction amounts.
    pub total: i64,
    /// Sum of amounts per category. Uncategorised transactions are not listed.
    pub by_category: BTreeMap<String, i64>,
    /// Creation time of the newest transaction, or the read time for an empty ledger.
    pub last_updated: DateTime<Utc>,
}

impl PointBalance {
    /// Fold a newest-first ledger into a balance.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_DATA` if the total or a category sum overflows.
    pub fn from_ledger(
        user_id: UserId,
        ledger: &[PointTransaction],
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
        for tx in ledger {
            if let Some(category) = &tx.category {
                let sum = by_category.entry(category.clone()).or_insert(0);
                *sum = checked_sum(*sum, tx.amount)?;
            }
        }
        Ok(Self {
            user_id,
            total: ledger_total(ledger)?,
            by_category,
            last_updated: ledger.first().map_or(now, |tx| tx.created_date),
        })
    }

    /// Check if the balance covers a deduction.
    #[must_use]
    pub const fn has_sufficient_points(&self, amount: i64) -> bool {
        self.total >= amount
    }
}

/// Sum of all amounts in a ledger.
///
/// # Errors
///
/// Returns `INVALID_DATA` if the sum does not fit in an `i64`.
pub fn ledger_total(ledger: &[PointTransaction]) -> Result<i64> {
    ledger
        .iter()
        .try_fold(0_i64, |total, tx| checked_sum(total, tx.amount))
}

fn checked_sum(total: i64, amount: i64) -> Result<i64> {
    total
        .checked_add(amount)
        .ok_or_else(|| GamificationError::InvalidData("point total overflows".into()))
}
