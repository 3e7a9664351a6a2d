//! Rule condition evaluation
//!
//! Every present condition must hold (AND); absent conditions always hold.
//! Amount bounds are inclusive on both ends, as is the date range.

use chrono::NaiveDate;

use crate::models::payment::{Payment, Student};
use crate::models::rule::RuleConditions;

/// Facts about a payment that rule conditions are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentContext<'a> {
    pub fee_type: &'a str,

    /// Minor units
    pub amount: i64,

    /// Payment date
    pub as_of: NaiveDate,

    /// Paying student's grade, if known
    pub grade_level: Option<&'a str>,
}

impl<'a> PaymentContext<'a> {
    pub fn new(fee_type: &'a str, amount: i64, as_of: NaiveDate) -> Self {
        Self {
            fee_type,
            amount,
            as_of,
            grade_level: None,
        }
    }

    pub fn with_grade_level(mut self, grade_level: &'a str) -> Self {
        self.grade_level = Some(grade_level);
        self
    }

    pub fn for_payment(payment: &'a Payment, student: &'a Student) -> Self {
        Self {
            fee_type: &payment.fee_type,
            amount: payment.amount,
            as_of: payment.paid_on,
            grade_level: student.grade_level.as_deref(),
        }
    }
}

/// The first condition a payment failed, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmetCondition {
    BelowMinAmount,
    AboveMaxAmount,
    FeeType,
    GradeLevel,
    OutsideDateRange,
}

impl UnmetCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            UnmetCondition::BelowMinAmount => "below_min_amount",
            UnmetCondition::AboveMaxAmount => "above_max_amount",
            UnmetCondition::FeeType => "fee_type",
            UnmetCondition::GradeLevel => "grade_level",
            UnmetCondition::OutsideDateRange => "outside_date_range",
        }
    }
}

impl RuleConditions {
    /// First unmet condition, or None if the payment is eligible
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use commission_engine_core_rs::{PaymentContext, RuleConditions, UnmetCondition};
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    /// let conditions = RuleConditions::default().with_min_amount(50_000);
    ///
    /// let below = PaymentContext::new("TUITION", 49_999, date);
    /// let at = PaymentContext::new("TUITION", 50_000, date);
    ///
    /// assert_eq!(conditions.first_unmet(&below), Some(UnmetCondition::BelowMinAmount));
    /// assert_eq!(conditions.first_unmet(&at), None);
    /// ```
    pub fn first_unmet(&self, ctx: &PaymentContext<'_>) -> Option<UnmetCondition> {
        if let Some(min) = self.min_amount {
            if ctx.amount < min {
                return Some(UnmetCondition::BelowMinAmount);
            }
        }

        if let Some(max) = self.max_amount {
            if ctx.amount > max {
                return Some(UnmetCondition::AboveMaxAmount);
            }
        }

        if let Some(fee_types) = self.fee_types.as_ref().filter(|set| !set.is_empty()) {
            if !fee_types.contains(ctx.fee_type) {
                return Some(UnmetCondition::FeeType);
            }
        }

        if let Some(grades) = self.grade_levels.as_ref().filter(|set| !set.is_empty()) {
            // A grade constraint can't be satisfied by a student with no grade
            let eligible = ctx.grade_level.map_or(false, |grade| grades.contains(grade));
            if !eligible {
                return Some(UnmetCondition::GradeLevel);
            }
        }

        if let Some(range) = self.date_range {
            if !range.contains(ctx.as_of) {
                return Some(UnmetCondition::OutsideDateRange);
            }
        }

        None
    }

    pub fn is_satisfied_by(&self, ctx: &PaymentContext<'_>) -> bool {
        self.first_unmet(ctx).is_none()
    }
}
