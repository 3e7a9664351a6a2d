//! Commission calculator
//!
//! Turns one completed payment into an ordered list of line items:
//!
//! ```text
//! Payment → Student → referring broker
//!                          │
//!                 ancestor chain (self-first)
//!                          │
//!          per broker: select rule → round(amount × pct / 100)
//!                          │
//!                    Vec<LineItem>
//! ```
//!
//! Nothing is written. A broker without a matching rule is skipped and the walk
//! continues with its parent; one level's ineligibility never hides the
//! levels above it.
//!
//! # Critical Invariants
//!
//! - **Determinism**: same payment + same broker/rule data ⇒ identical line items
//! - **Independent rounding**: each line item is rounded on its own
//! - **All or nothing**: on error no partial list is returned

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{CalculationFailed, CommissionError, EntityKind, IntegrityViolation};
use crate::hierarchy::ancestor_chain;
use crate::models::commission::LineItem;
use crate::money::commission_amount;
use crate::rules::{select_rule, PaymentContext};
use crate::store::{BrokerDirectory, PaymentSource, RuleStore};

/// Result of calculating commissions for one payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    pub tenant_id: String,
    pub payment_id: String,

    /// Self-first hierarchy order; brokers without a matching rule are absent
    pub line_items: Vec<LineItem>,
}

impl Calculation {
    fn empty(tenant_id: &str, payment_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            payment_id: payment_id.to_string(),
            line_items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Sum of all line item commissions (minor units), saturating at `i64::MAX`
    pub fn total_commission(&self) -> i64 {
        self.line_items
            .iter()
            .fold(0i64, |total, item| total.saturating_add(item.commission_amount))
    }

    pub fn digest(&self) -> String {
        calculation_digest(&self.line_items)
    }
}

/// SHA-256 over the line items' fields, in order
///
/// Two calculations with identical line items have identical digests. Fields
/// are separated by a unit separator and items by a record separator so that
/// adjacent fields cannot run together.
pub fn calculation_digest(line_items: &[LineItem]) -> String {
    let mut hasher = Sha256::new();
    for item in line_items {
        let level = item.level.to_string();
        let percentage = item.percentage.normalize().to_string();
        let base_amount = item.base_amount.to_string();
        let commission = item.commission_amount.to_string();
        let fields: [&str; 8] = [
            &item.broker_id,
            &item.broker_name,
            &level,
            &item.rule_id,
            &item.rule_name,
            &percentage,
            &base_amount,
            &commission,
        ];
        for field in fields {
            hasher.update(field.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(b"\x1e");
    }
    format!("{:x}", hasher.finalize())
}

/// Read-only commission calculator
pub struct CommissionCalculator {
    directory: Arc<dyn BrokerDirectory>,
    rules: Arc<dyn RuleStore>,
    payments: Arc<dyn PaymentSource>,
    max_depth: usize,
    skip_inactive_brokers: bool,
}

impl CommissionCalculator {
    pub fn new(
        directory: Arc<dyn BrokerDirectory>,
        rules: Arc<dyn RuleStore>,
        payments: Arc<dyn PaymentSource>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            directory,
            rules,
            payments,
            max_depth: config.max_hierarchy_depth,
            skip_inactive_brokers: config.skip_inactive_brokers,
        }
    }

    /// Calculate line items for `payment_id` without persisting anything
    pub fn calculate(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Calculation, CalculationFailed> {
        self.calculate_with(self.directory.as_ref(), tenant_id, payment_id)
    }

    /// Same as [`calculate`](Self::calculate) but walking `directory`
    /// instead of the configured one (e.g. a preloaded snapshot)
    pub fn calculate_with(
        &self,
        directory: &dyn BrokerDirectory,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Calculation, CalculationFailed> {
        self.run(directory, tenant_id, payment_id).map_err(|reason| {
            warn!(tenant_id, payment_id, error = %reason, "Commission calculation failed");
            CalculationFailed {
                payment_id: payment_id.to_string(),
                reason,
            }
        })
    }

    pub fn directory(&self) -> &dyn BrokerDirectory {
        self.directory.as_ref()
    }

    fn run(
        &self,
        directory: &dyn BrokerDirectory,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Calculation, CommissionError> {
        let payment = self
            .payments
            .payment(tenant_id, payment_id)?
            .ok_or_else(|| CommissionError::not_found(EntityKind::Payment, payment_id))?;

        if !payment.is_completed() {
            return Err(CommissionError::PaymentNotCompleted {
                payment_id: payment.id.clone(),
                status: payment.status,
            });
        }
        if payment.amount <= 0 {
            return Err(IntegrityViolation::NonPositiveAmount {
                payment_id: payment.id.clone(),
                amount: payment.amount,
            }
            .into());
        }

        let student = self
            .payments
            .student(tenant_id, &payment.student_id)?
            .ok_or_else(|| CommissionError::not_found(EntityKind::Student, &payment.student_id))?;

        let Some(referrer_id) = student.referring_broker_id.as_deref() else {
            debug!(tenant_id, payment_id, student_id = %student.id, "Student has no referring broker");
            return Ok(Calculation::empty(tenant_id, payment_id));
        };

        let chain = ancestor_chain(directory, tenant_id, referrer_id, self.max_depth)?;
        let ctx = PaymentContext::for_payment(&payment, &student);

        let mut line_items = Vec::with_capacity(chain.len());
        for broker in &chain {
            if self.skip_inactive_brokers && !broker.is_active() {
                debug!(tenant_id, payment_id, broker_id = broker.id(), "Skipping inactive broker");
                continue;
            }

            let Some(matched) = select_rule(self.rules.as_ref(), tenant_id, broker.id(), &ctx)? else {
                debug!(
                    tenant_id,
                    payment_id,
                    broker_id = broker.id(),
                    level = broker.level(),
                    "No matching rule"
                );
                continue;
            };

            let amount = commission_amount(payment.amount, matched.percentage).ok_or_else(|| {
                IntegrityViolation::AmountOverflow {
                    base_amount: payment.amount,
                    percentage: matched.percentage.value(),
                }
            })?;

            line_items.push(LineItem {
                broker_id: broker.id().to_string(),
                broker_name: broker.name().to_string(),
                level: broker.level(),
                rule_id: matched.rule.id().to_string(),
                rule_name: matched.rule.name().to_string(),
                percentage: matched.percentage.value(),
                base_amount: payment.amount,
                commission_amount: amount,
            });
        }

        debug!(
            tenant_id,
            payment_id,
            chain_length = chain.len(),
            line_items = line_items.len(),
            "Commission calculation complete"
        );

        Ok(Calculation {
            tenant_id: tenant_id.to_string(),
            payment_id: payment_id.to_string(),
            line_items,
        })
    }
}
