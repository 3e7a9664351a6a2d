//! Commission rule model
//!
//! A rule is bound to exactly one broker and says "this broker earns P% of a
//! payment when all of these conditions hold". Each rule has:
//! - A percentage in (0, 100]
//! - A priority (higher wins)
//! - A creation timestamp (newer wins on equal priority)
//! - A typed condition set where every field is optional
//!
//! Absent condition fields never constrain a payment.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::broker::Broker;
use crate::money::{Percentage, PercentageError};

/// Errors that can occur building a rule
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("Invalid percentage: {0}")]
    InvalidPercentage(#[from] PercentageError),

    #[error("Minimum amount {min} exceeds maximum amount {max}")]
    InvertedAmountRange { min: i64, max: i64 },

    #[error("Date range starts {start} after it ends {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

/// Inclusive date window; either end may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,

    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| start <= date) && self.end.map_or(true, |end| date <= end)
    }
}

/// Eligibility conditions for a rule
///
/// Evaluated with AND semantics over the fields that are present. An empty
/// fee-type or grade-level set is treated the same as an absent one.
///
/// # Example
/// ```
/// use commission_engine_core_rs::RuleConditions;
///
/// let conditions = RuleConditions::default()
///     .with_min_amount(10_000)
///     .with_fee_types(["TUITION"]);
///
/// assert_eq!(conditions.min_amount, Some(10_000));
/// assert!(conditions.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    /// Inclusive lower bound (minor units)
    #[serde(default)]
    pub min_amount: Option<i64>,

    /// Inclusive upper bound (minor units)
    #[serde(default)]
    pub max_amount: Option<i64>,

    #[serde(default)]
    pub fee_types: Option<BTreeSet<String>>,

    #[serde(default)]
    pub grade_levels: Option<BTreeSet<String>>,

    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl RuleConditions {
    pub fn with_min_amount(mut self, min: i64) -> Self {
        self.min_amount = Some(min);
        self
    }

    pub fn with_max_amount(mut self, max: i64) -> Self {
        self.max_amount = Some(max);
        self
    }

    pub fn with_fee_types<I, S>(mut self, fee_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fee_types = Some(fee_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_grade_levels<I, S>(mut self, grades: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grade_levels = Some(grades.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Reject ranges that can never match
    pub fn validate(&self) -> Result<(), RuleError> {
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(RuleError::InvertedAmountRange { min, max });
            }
        }
        if let Some(DateRange {
            start: Some(start),
            end: Some(end),
        }) = self.date_range
        {
            if start > end {
                return Err(RuleError::InvertedDateRange { start, end });
            }
        }
        Ok(())
    }
}

/// A payout rule bound to one broker
///
/// # Example
/// ```
/// use commission_engine_core_rs::{Broker, CommissionRule, RuleConditions};
/// use rust_decimal::Decimal;
///
/// let agent = Broker::root("b-1", "school-1", "Agent", "AG");
/// let rule = CommissionRule::new("r-1", &agent, "Standard 5%", Decimal::new(5, 0))
///     .unwrap()
///     .with_priority(10)
///     .with_conditions(RuleConditions::default().with_min_amount(50_000))
///     .unwrap();
///
/// assert_eq!(rule.broker_id(), "b-1");
/// assert_eq!(rule.priority(), 10);
/// assert!(rule.is_active());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    id: String,

    tenant_id: String,

    broker_id: String,

    name: String,

    /// Informational copy of the broker's level when the rule was created
    level: u32,

    /// Stored as a raw decimal so that corrupt persisted values are
    /// detectable at selection time rather than lost at load time
    percentage: Decimal,

    conditions: RuleConditions,

    /// Higher = preferred
    priority: i32,

    active: bool,

    created_at: DateTime<Utc>,
}

impl CommissionRule {
    /// Create a new active rule for `broker` with priority 0 and no conditions
    pub fn new(
        id: impl Into<String>,
        broker: &Broker,
        name: impl Into<String>,
        percentage: Decimal,
    ) -> Result<Self, RuleError> {
        let percentage = Percentage::new(percentage)?;
        Ok(Self {
            id: id.into(),
            tenant_id: broker.tenant_id().to_string(),
            broker_id: broker.id().to_string(),
            name: name.into(),
            level: broker.level(),
            percentage: percentage.value(),
            conditions: RuleConditions::default(),
            priority: 0,
            active: true,
            created_at: Utc::now(),
        })
    }

    /// Restore a rule exactly as stored
    ///
    /// The percentage is not validated; the selector reports out-of-range
    /// values as data integrity violations.
    #[allow(clippy::too_many_arguments)]
    pub fn from_snapshot(
        id: String,
        tenant_id: String,
        broker_id: String,
        name: String,
        level: u32,
        percentage: Decimal,
        conditions: RuleConditions,
        priority: i32,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            broker_id,
            name,
            level,
            percentage,
            conditions,
            priority,
            active,
            created_at,
        }
    }

    /// Set priority (builder pattern)
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set conditions (builder pattern), rejecting unsatisfiable ranges
    pub fn with_conditions(mut self, conditions: RuleConditions) -> Result<Self, RuleError> {
        conditions.validate()?;
        self.conditions = conditions;
        Ok(self)
    }

    /// Override the creation timestamp (builder pattern)
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Mark inactive (builder pattern)
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn broker_id(&self) -> &str {
        &self.broker_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Raw stored percentage; see [`Percentage::new`] for validation
    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    pub fn conditions(&self) -> &RuleConditions {
        &self.conditions
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.created_at
    }
}
