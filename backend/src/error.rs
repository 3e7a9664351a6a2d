//! Error taxonomy for calculation and commit
//!
//! Outcomes that are *not* errors:
//! - Student without a referring broker: empty calculation
//! - Broker without a matching rule: no line item for that broker
//! - Line item already persisted: skipped by the ledger

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::commission::CommissionStatus;
use crate::models::payment::PaymentStatus;
use crate::store::StoreError;

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Payment,
    Student,
    Broker,
    Commission,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Payment => "Payment",
            EntityKind::Student => "Student",
            EntityKind::Broker => "Broker",
            EntityKind::Commission => "Commission",
        };
        f.write_str(name)
    }
}

/// Stored data that breaks an invariant the engine relies on
///
/// Always fatal for the calculation at hand; never clamped or skipped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntegrityViolation {
    #[error("Hierarchy walk from broker {start} exceeded maximum depth {max_depth}")]
    DepthExceeded { start: String, max_depth: usize },

    #[error("Broker {broker_id} has level {actual}, expected {expected}")]
    LevelMismatch {
        broker_id: String,
        actual: u32,
        expected: u32,
    },

    #[error("Broker {broker_id} has level {level}; no broker can sit below it")]
    LevelOverflow { broker_id: String, level: u32 },

    #[error("Broker {broker_id} references missing parent {parent_id}")]
    DanglingParent { broker_id: String, parent_id: String },

    #[error("Rule {rule_id} has percentage {percentage} outside (0, 100]")]
    PercentageOutOfRange { rule_id: String, percentage: Decimal },

    #[error("Payment {payment_id} has non-positive amount {amount}")]
    NonPositiveAmount { payment_id: String, amount: i64 },

    #[error("Commission on {base_amount} at {percentage}% overflows")]
    AmountOverflow { base_amount: i64, percentage: Decimal },
}

/// Errors raised by the commission engine
#[derive(Debug, Error, PartialEq)]
pub enum CommissionError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Payment {payment_id} is not completed (status {status:?})")]
    PaymentNotCompleted {
        payment_id: String,
        status: PaymentStatus,
    },

    #[error("Data integrity violation: {0}")]
    DataIntegrity(#[from] IntegrityViolation),

    #[error("Illegal status transition for commission {commission_id}: {from} -> {to}")]
    IllegalTransition {
        commission_id: String,
        from: CommissionStatus,
        to: CommissionStatus,
    },

    #[error("Storage transaction failed: {0}")]
    Transaction(#[from] StoreError),

    /// Concurrent commits kept winning the race and some line items still
    /// have no record
    #[error("Commit for payment {payment_id} kept conflicting; unrecorded brokers: {unrecorded:?}")]
    CommitContended {
        payment_id: String,
        unrecorded: Vec<String>,
    },
}

impl CommissionError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        CommissionError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CommissionError::Transaction(e) => e.is_transient(),
            CommissionError::CommitContended { .. } => true,
            _ => false,
        }
    }
}

/// A calculation failed; no line items are returned
#[derive(Debug, Error, PartialEq)]
#[error("could not calculate commissions for payment {payment_id}: {reason}")]
pub struct CalculationFailed {
    pub payment_id: String,
    #[source]
    pub reason: CommissionError,
}

/// A commit failed; no records from this call were written
#[derive(Debug, Error, PartialEq)]
#[error("no commissions were recorded for payment {payment_id}: {reason}")]
pub struct CommitFailed {
    pub payment_id: String,
    #[source]
    pub reason: CommissionError,
}

/// A batch calculation failed
#[derive(Debug, Error, PartialEq)]
pub enum BatchCalculationError {
    /// The tenant's hierarchy could not be read; no payment was attempted
    #[error("could not load broker hierarchy for tenant {tenant_id}: {reason}")]
    Snapshot {
        tenant_id: String,
        #[source]
        reason: StoreError,
    },

    #[error(transparent)]
    Calculation(#[from] CalculationFailed),
}

/// Failure of a combined calculate-then-commit run
#[derive(Debug, Error, PartialEq)]
pub enum ProcessingError {
    #[error(transparent)]
    Calculation(#[from] CalculationFailed),

    #[error(transparent)]
    Commit(#[from] CommitFailed),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_failed_message() {
        let err = CalculationFailed {
            payment_id: "pay-7".to_string(),
            reason: CommissionError::not_found(EntityKind::Student, "stu-1"),
        };
        assert_eq!(
            err.to_string(),
            "could not calculate commissions for payment pay-7: Student stu-1 not found"
        );
    }

    #[test]
    fn test_commit_failed_message() {
        let err = CommitFailed {
            payment_id: "pay-7".to_string(),
            reason: CommissionError::Transaction(StoreError::Unavailable("timeout".to_string())),
        };
        assert!(err
            .to_string()
            .starts_with("no commissions were recorded for payment pay-7"));
        assert!(err.reason.is_retryable());
    }

    #[test]
    fn test_contended_commit_is_retryable() {
        let err = CommissionError::CommitContended {
            payment_id: "pay-7".to_string(),
            unrecorded: vec!["b1".to_string()],
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("b1"));
    }

    #[test]
    fn test_snapshot_failure_names_tenant() {
        let err = BatchCalculationError::Snapshot {
            tenant_id: "school-1".to_string(),
            reason: StoreError::Unavailable("timeout".to_string()),
        };
        assert!(err
            .to_string()
            .starts_with("could not load broker hierarchy for tenant school-1"));
    }

    #[test]
    fn test_integrity_is_not_retryable() {
        let err = CommissionError::from(IntegrityViolation::DepthExceeded {
            start: "b1".to_string(),
            max_depth: 32,
        });
        assert!(!err.is_retryable());
    }
}
