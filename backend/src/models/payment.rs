//! Payment and student records
//!
//! Both are owned by the fee-management side of the system and are read-only
//! here. Only completed payments are ever compensated.
//!
//! CRITICAL: All money values are i64 (minor units)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Payment lifecycle as reported by the fee-management collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// A monetary transaction made by a student against a fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub tenant_id: String,
    pub student_id: String,

    /// Amount paid (minor units)
    pub amount: i64,

    /// e.g. "TUITION", "TRANSPORT", "EXAM"
    pub fee_type: String,

    /// Reference date for date-range rule conditions
    pub paid_on: NaiveDate,

    pub status: PaymentStatus,
}

impl Payment {
    /// Create a completed payment
    pub fn completed(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        student_id: impl Into<String>,
        amount: i64,
        fee_type: impl Into<String>,
        paid_on: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            student_id: student_id.into(),
            amount,
            fee_type: fee_type.into(),
            paid_on,
            status: PaymentStatus::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

/// The paying student, as far as commissions are concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub tenant_id: String,

    /// e.g. "GRADE_5"; None if not enrolled in a grade
    #[serde(default)]
    pub grade_level: Option<String>,

    /// Broker who referred the student, if any
    #[serde(default)]
    pub referring_broker_id: Option<String>,
}

impl Student {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            grade_level: None,
            referring_broker_id: None,
        }
    }

    /// Set referring broker (builder pattern)
    pub fn referred_by(mut self, broker_id: impl Into<String>) -> Self {
        self.referring_broker_id = Some(broker_id.into());
        self
    }

    /// Set grade level (builder pattern)
    pub fn in_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade_level = Some(grade.into());
        self
    }
}
