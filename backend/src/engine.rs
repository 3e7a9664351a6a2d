//! Commission engine facade
//!
//! Wires configuration and collaborator ports into a calculator and a ledger,
//! and exposes the operations callers use:
//! - `calculate`: preview, no persistence
//! - `commit`: idempotent persistence of line items
//! - `list_for_broker`: read query
//! - `process_payment`: calculate + commit for a payment-completed hook

use std::sync::Arc;

use tracing::{info, warn};

use crate::calculator::{Calculation, CommissionCalculator};
use crate::config::{ConfigError, EngineConfig};
use crate::error::{
    BatchCalculationError, CalculationFailed, CommissionError, CommitFailed, ProcessingError,
};
use crate::hierarchy::HierarchySnapshot;
use crate::ledger::{CommissionLedger, CommitOutcome};
use crate::models::commission::{Commission, CommissionStatus, LineItem};
use crate::store::{BrokerDirectory, CommissionStore, PaymentSource, RuleStore};

/// Entry point for commission calculation and persistence
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use commission_engine_core_rs::store::{
///     InMemoryBrokerDirectory, InMemoryCommissionStore, InMemoryPaymentSource, InMemoryRuleStore,
/// };
/// use commission_engine_core_rs::{CommissionEngine, CommissionRule, EngineConfig, Payment, Student};
///
/// let directory = Arc::new(InMemoryBrokerDirectory::new());
/// let rules = Arc::new(InMemoryRuleStore::new());
/// let payments = Arc::new(InMemoryPaymentSource::new());
/// let store = Arc::new(InMemoryCommissionStore::new());
///
/// let top = directory.register("school-1", "top", "Top", "TOP", None).unwrap();
/// rules.upsert(CommissionRule::new("r-top", &top, "Flat 2%", Decimal::new(2, 0)).unwrap()).unwrap();
/// payments.add_student(Student::new("stu-1", "school-1").referred_by("top")).unwrap();
/// payments.add_payment(Payment::completed(
///     "pay-1", "school-1", "stu-1", 50_000, "TUITION",
///     NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
/// )).unwrap();
///
/// let engine = CommissionEngine::new(EngineConfig::default(), directory, rules, payments, store).unwrap();
///
/// let preview = engine.calculate("school-1", "pay-1").unwrap();
/// assert_eq!(preview.total_commission(), 1_000);
///
/// let outcome = engine.commit("school-1", "pay-1", &preview.line_items).unwrap();
/// assert_eq!(outcome.inserted, 1);
///
/// let again = engine.commit("school-1", "pay-1", &preview.line_items).unwrap();
/// assert!(again.is_noop());
/// ```
pub struct CommissionEngine {
    config: EngineConfig,
    calculator: CommissionCalculator,
    ledger: CommissionLedger,
}

impl CommissionEngine {
    pub fn new(
        config: EngineConfig,
        directory: Arc<dyn BrokerDirectory>,
        rules: Arc<dyn RuleStore>,
        payments: Arc<dyn PaymentSource>,
        store: Arc<dyn CommissionStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let calculator = CommissionCalculator::new(directory, rules, payments, &config);
        let ledger = CommissionLedger::new(store, &config);
        Ok(Self {
            config,
            calculator,
            ledger,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &CommissionLedger {
        &self.ledger
    }

    /// Preview commissions for a payment; writes nothing
    pub fn calculate(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Calculation, CalculationFailed> {
        self.calculator.calculate(tenant_id, payment_id)
    }

    /// Calculate several payments of one tenant against a single broker
    /// snapshot
    ///
    /// # Errors
    ///
    /// - `Snapshot` if the tenant's hierarchy cannot be read; no payment is
    ///   attempted
    /// - `Calculation` for the first failing payment
    pub fn calculate_batch(
        &self,
        tenant_id: &str,
        payment_ids: &[&str],
    ) -> Result<Vec<Calculation>, BatchCalculationError> {
        if payment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = HierarchySnapshot::load(self.calculator.directory(), tenant_id).map_err(
            |reason| {
                warn!(tenant_id, error = %reason, "Broker snapshot load failed");
                BatchCalculationError::Snapshot {
                    tenant_id: tenant_id.to_string(),
                    reason,
                }
            },
        )?;

        let calculations = payment_ids
            .iter()
            .map(|payment_id| {
                self.calculator
                    .calculate_with(&snapshot, tenant_id, payment_id)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(calculations)
    }

    /// Persist line items for a payment; safe to repeat
    pub fn commit(
        &self,
        tenant_id: &str,
        payment_id: &str,
        line_items: &[LineItem],
    ) -> Result<CommitOutcome, CommitFailed> {
        self.ledger.commit(tenant_id, payment_id, line_items)
    }

    /// Calculate and immediately commit
    pub fn process_payment(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<CommitOutcome, ProcessingError> {
        let calculation = self.calculate(tenant_id, payment_id)?;
        let outcome = self.commit(tenant_id, payment_id, &calculation.line_items)?;

        info!(
            tenant_id,
            payment_id,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            total = outcome.total_commission(),
            "Payment commissions processed"
        );
        Ok(outcome)
    }

    /// Records for a broker, newest first, optionally filtered by status
    pub fn list_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>, CommissionError> {
        self.ledger.list_for_broker(tenant_id, broker_id, status)
    }
}
