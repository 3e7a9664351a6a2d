//! Commission model
//!
//! Two shapes of the same result:
//! - [`LineItem`]: in-memory output of a calculation, never persisted as-is
//! - [`Commission`]: the immutable persisted record created from a line item
//!
//! A commission snapshots the broker and rule names at commit time so later
//! edits to either never rewrite history.
//!
//! CRITICAL: All money values are i64 (minor units)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Commission record lifecycle
///
/// ```text
/// PENDING ──> APPROVED ──> PAID
///    │            │
///    └──> REJECTED <┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl CommissionStatus {
    pub const ALL: [CommissionStatus; 4] = [
        CommissionStatus::Pending,
        CommissionStatus::Approved,
        CommissionStatus::Paid,
        CommissionStatus::Rejected,
    ];

    /// Whether an administrative transition from `self` to `next` is legal
    ///
    /// # Example
    /// ```
    /// use commission_engine_core_rs::CommissionStatus;
    ///
    /// assert!(CommissionStatus::Pending.can_transition_to(CommissionStatus::Approved));
    /// assert!(!CommissionStatus::Pending.can_transition_to(CommissionStatus::Paid));
    /// assert!(!CommissionStatus::Paid.can_transition_to(CommissionStatus::Rejected));
    /// ```
    pub fn can_transition_to(self, next: CommissionStatus) -> bool {
        matches!(
            (self, next),
            (CommissionStatus::Pending, CommissionStatus::Approved)
                | (CommissionStatus::Approved, CommissionStatus::Paid)
                | (CommissionStatus::Pending, CommissionStatus::Rejected)
                | (CommissionStatus::Approved, CommissionStatus::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CommissionStatus::Paid | CommissionStatus::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommissionStatus::Pending => "PENDING",
            CommissionStatus::Approved => "APPROVED",
            CommissionStatus::Paid => "PAID",
            CommissionStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broker's calculated commission for one payment (not persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub broker_id: String,
    pub broker_name: String,
    pub level: u32,
    pub rule_id: String,
    pub rule_name: String,
    pub percentage: Decimal,

    /// Payment amount at calculation time (minor units)
    pub base_amount: i64,

    /// `base_amount × percentage / 100`, rounded half-up (minor units)
    pub commission_amount: i64,
}

/// Broker/rule facts captured when the record was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSnapshot {
    pub broker_name: String,
    pub broker_level: u32,
    pub rule_name: Option<String>,

    /// SHA-256 of the calculation this record was committed from
    pub calculation_digest: String,
}

/// Persisted commission record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    id: String,
    tenant_id: String,
    broker_id: String,
    payment_id: String,

    /// None only for records written without a matching rule, which signals
    /// a data problem upstream
    rule_id: Option<String>,

    percentage: Decimal,
    base_amount: i64,
    commission_amount: i64,
    status: CommissionStatus,
    snapshot: CommissionSnapshot,
    created_at: DateTime<Utc>,
}

impl Commission {
    /// Create a new PENDING record from a calculated line item
    pub fn from_line_item(
        tenant_id: &str,
        payment_id: &str,
        item: &LineItem,
        calculation_digest: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            broker_id: item.broker_id.clone(),
            payment_id: payment_id.to_string(),
            rule_id: Some(item.rule_id.clone()),
            percentage: item.percentage,
            base_amount: item.base_amount,
            commission_amount: item.commission_amount,
            status: CommissionStatus::Pending,
            snapshot: CommissionSnapshot {
                broker_name: item.broker_name.clone(),
                broker_level: item.level,
                rule_name: Some(item.rule_name.clone()),
                calculation_digest: calculation_digest.to_string(),
            },
            created_at,
        }
    }

    /// Restore a record exactly as stored
    #[allow(clippy::too_many_arguments)]
    pub fn from_snapshot(
        id: String,
        tenant_id: String,
        broker_id: String,
        payment_id: String,
        rule_id: Option<String>,
        percentage: Decimal,
        base_amount: i64,
        commission_amount: i64,
        status: CommissionStatus,
        snapshot: CommissionSnapshot,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            broker_id,
            payment_id,
            rule_id,
            percentage,
            base_amount,
            commission_amount,
            status,
            snapshot,
            created_at,
        }
    }

    /// Copy of this record in a new status
    ///
    /// Callers are responsible for checking
    /// [`CommissionStatus::can_transition_to`] first.
    pub fn with_status(&self, status: CommissionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
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

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    pub fn base_amount(&self) -> i64 {
        self.base_amount
    }

    pub fn commission_amount(&self) -> i64 {
        self.commission_amount
    }

    pub fn status(&self) -> CommissionStatus {
        self.status
    }

    pub fn snapshot(&self) -> &CommissionSnapshot {
        &self.snapshot
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this record was written without a rule
    pub fn is_unruled(&self) -> bool {
        self.rule_id.is_none()
    }
}
