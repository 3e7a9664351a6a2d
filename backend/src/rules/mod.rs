//! Rule selection
//!
//! Picks the single rule a broker is paid under for a payment:
//! 1. Fetch the broker's active rules
//! 2. Order them by priority (desc), creation time (desc), id (asc)
//! 3. Return the first rule whose conditions all hold
//!
//! The order is total, so the same inputs always select the same rule.

pub mod eligibility;

use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::error::{CommissionError, IntegrityViolation};
use crate::models::rule::CommissionRule;
use crate::money::Percentage;
use crate::store::RuleStore;

pub use eligibility::{PaymentContext, UnmetCondition};

/// A selected rule together with its validated percentage
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: CommissionRule,
    pub percentage: Percentage,
}

/// Total precedence order for rules of one broker
///
/// Higher priority first; among equal priorities the most recently created;
/// among equal creation times the smallest id.
pub fn precedence(a: &CommissionRule, b: &CommissionRule) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| b.creation_time().cmp(&a.creation_time()))
        .then_with(|| a.id().cmp(b.id()))
}

/// Select the rule `broker_id` is paid under for the payment in `ctx`
///
/// Returns `Ok(None)` if no active rule matches. Every rule inspected up to
/// and including the match must carry a percentage in (0, 100]; anything
/// else is reported as a data integrity violation.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use commission_engine_core_rs::store::InMemoryRuleStore;
/// use commission_engine_core_rs::{select_rule, Broker, CommissionRule, PaymentContext};
/// use rust_decimal::Decimal;
///
/// let broker = Broker::root("b-1", "school-1", "Top", "TOP");
/// let rules = InMemoryRuleStore::new();
/// rules.upsert(CommissionRule::new("low", &broker, "Low", Decimal::new(1, 0)).unwrap().with_priority(5)).unwrap();
/// rules.upsert(CommissionRule::new("high", &broker, "High", Decimal::new(2, 0)).unwrap().with_priority(10)).unwrap();
///
/// let ctx = PaymentContext::new("TUITION", 10_000, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
/// let selected = select_rule(&rules, "school-1", "b-1", &ctx).unwrap().unwrap();
/// assert_eq!(selected.rule.id(), "high");
/// ```
pub fn select_rule(
    rules: &dyn RuleStore,
    tenant_id: &str,
    broker_id: &str,
    ctx: &PaymentContext<'_>,
) -> Result<Option<RuleMatch>, CommissionError> {
    let mut candidates = rules.active_rules_for_broker(tenant_id, broker_id)?;
    candidates.retain(|rule| rule.is_active());
    candidates.sort_by(precedence);

    for rule in candidates {
        let percentage = Percentage::new(rule.percentage()).map_err(|_| {
            IntegrityViolation::PercentageOutOfRange {
                rule_id: rule.id().to_string(),
                percentage: rule.percentage(),
            }
        })?;

        match rule.conditions().first_unmet(ctx) {
            None => {
                debug!(
                    tenant_id,
                    broker_id,
                    rule_id = rule.id(),
                    priority = rule.priority(),
                    percentage = %percentage,
                    "Rule matched"
                );
                return Ok(Some(RuleMatch { rule, percentage }));
            }
            Some(unmet) => {
                trace!(
                    tenant_id,
                    broker_id,
                    rule_id = rule.id(),
                    reason = unmet.as_str(),
                    "Rule not eligible"
                );
            }
        }
    }

    Ok(None)
}
