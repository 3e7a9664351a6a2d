//! Commission ledger
//!
//! Persists calculated line items as PENDING commission records.
//!
//! # Commit Flow
//!
//! ```text
//! line items ──> read existing records for the payment
//!                     │
//!          split: already persisted (skip) / new
//!                     │
//!          insert_batch(new)  ── all or nothing
//!                     │
//!        UniqueViolation? ──> a concurrent commit won: re-read, retry
//! ```
//!
//! # Critical Invariants
//!
//! 1. **Idempotency**: committing the same payment twice never duplicates a record
//! 2. **Atomicity**: one commit call writes all of its new records or none
//! 3. **Immutability**: existing records are never rewritten by a commit

pub mod events;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::calculator::calculation_digest;
use crate::config::EngineConfig;
use crate::error::{CommissionError, CommitFailed, EntityKind};
use crate::models::commission::{Commission, CommissionStatus, LineItem};
use crate::store::{CommissionStore, StoreError};

pub use events::{LedgerEvent, LedgerEventLog, DEFAULT_EVENT_LOG_CAPACITY};

/// What a commit call did
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    pub payment_id: String,

    /// Persisted record for each committed line item, in line item order
    pub records: Vec<Commission>,

    /// Records written by this call
    pub inserted: usize,

    /// Line items that already had a record
    pub skipped: usize,
}

impl CommitOutcome {
    fn empty(payment_id: &str) -> Self {
        Self {
            payment_id: payment_id.to_string(),
            records: Vec::new(),
            inserted: 0,
            skipped: 0,
        }
    }

    /// True if this call wrote nothing
    pub fn is_noop(&self) -> bool {
        self.inserted == 0
    }

    /// Saturates at `i64::MAX`
    pub fn total_commission(&self) -> i64 {
        self.records
            .iter()
            .fold(0i64, |total, record| total.saturating_add(record.commission_amount()))
    }
}

/// Count and amount of records in one status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTotals {
    pub count: usize,

    /// Minor units
    pub amount: i64,
}

/// Per-status totals for one broker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerCommissionSummary {
    pub broker_id: String,
    pub pending: StatusTotals,
    pub approved: StatusTotals,
    pub paid: StatusTotals,
    pub rejected: StatusTotals,
}

impl BrokerCommissionSummary {
    /// Earned but not yet paid out
    pub fn outstanding(&self) -> i64 {
        self.pending.amount.saturating_add(self.approved.amount)
    }

    /// Everything not rejected
    pub fn total_earned(&self) -> i64 {
        self.outstanding().saturating_add(self.paid.amount)
    }

    fn totals_mut(&mut self, status: CommissionStatus) -> &mut StatusTotals {
        match status {
            CommissionStatus::Pending => &mut self.pending,
            CommissionStatus::Approved => &mut self.approved,
            CommissionStatus::Paid => &mut self.paid,
            CommissionStatus::Rejected => &mut self.rejected,
        }
    }
}

/// Idempotent, transactional persistence for commission records
pub struct CommissionLedger {
    store: Arc<dyn CommissionStore>,
    events: LedgerEventLog,
    conflict_retries: usize,
}

impl CommissionLedger {
    pub fn new(store: Arc<dyn CommissionStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            events: LedgerEventLog::with_capacity(config.event_log_capacity),
            conflict_retries: config.commit_conflict_retries,
        }
    }

    pub fn events(&self) -> &LedgerEventLog {
        &self.events
    }

    /// Persist `line_items` for `payment_id`
    ///
    /// Line items whose broker already has a record for this payment are
    /// skipped. Everything else is written in a single batch. A batch that
    /// loses a uniqueness race to a concurrent commit is re-planned against
    /// the rows the competitor wrote, up to `commit_conflict_retries` times.
    ///
    /// # Errors
    ///
    /// - `CommitContended` if retries run out while some line items still
    ///   have no record
    /// - `Transaction` for any other storage failure
    ///
    /// Either way nothing from this call was written and the whole call can
    /// be retried safely.
    pub fn commit(
        &self,
        tenant_id: &str,
        payment_id: &str,
        line_items: &[LineItem],
    ) -> Result<CommitOutcome, CommitFailed> {
        self.commit_inner(tenant_id, payment_id, line_items)
            .map_err(|reason| {
                warn!(tenant_id, payment_id, error = %reason, "Commission commit failed");
                CommitFailed {
                    payment_id: payment_id.to_string(),
                    reason,
                }
            })
    }

    fn commit_inner(
        &self,
        tenant_id: &str,
        payment_id: &str,
        line_items: &[LineItem],
    ) -> Result<CommitOutcome, CommissionError> {
        let mut seen = HashSet::new();
        let mut items: Vec<&LineItem> = Vec::with_capacity(line_items.len());
        for item in line_items {
            if seen.insert(item.broker_id.as_str()) {
                items.push(item);
            } else {
                warn!(tenant_id, payment_id, broker_id = %item.broker_id, "Dropping repeated line item");
            }
        }

        if items.is_empty() {
            return Ok(CommitOutcome::empty(payment_id));
        }

        let digest = calculation_digest(line_items);
        let mut attempt = 0;

        loop {
            let existing = self.existing_by_broker(tenant_id, payment_id)?;
            let created_at = Utc::now();
            let fresh: Vec<Commission> = items
                .iter()
                .filter(|item| !existing.contains_key(&item.broker_id))
                .map(|item| Commission::from_line_item(tenant_id, payment_id, item, &digest, created_at))
                .collect();

            if fresh.is_empty() {
                return Ok(self.finish(tenant_id, payment_id, &items, existing, Vec::new()));
            }

            match self.store.insert_batch(fresh.clone()) {
                Ok(()) => return Ok(self.finish(tenant_id, payment_id, &items, existing, fresh)),
                Err(StoreError::UniqueViolation { broker_id, .. }) => {
                    info!(
                        tenant_id,
                        payment_id,
                        broker_id = %broker_id,
                        attempt,
                        "Commit lost a uniqueness race; batch rolled back"
                    );
                    self.events.log(LedgerEvent::BatchConflict {
                        tenant_id: tenant_id.to_string(),
                        payment_id: payment_id.to_string(),
                        attempt,
                    });

                    if attempt >= self.conflict_retries {
                        let existing = self.existing_by_broker(tenant_id, payment_id)?;
                        let unrecorded: Vec<String> = items
                            .iter()
                            .filter(|item| !existing.contains_key(&item.broker_id))
                            .map(|item| item.broker_id.clone())
                            .collect();
                        if !unrecorded.is_empty() {
                            return Err(CommissionError::CommitContended {
                                payment_id: payment_id.to_string(),
                                unrecorded,
                            });
                        }
                        // The competing commit wrote every row
                        return Ok(self.finish(tenant_id, payment_id, &items, existing, Vec::new()));
                    }
                    attempt += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn existing_by_broker(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<HashMap<String, Commission>, StoreError> {
        Ok(self
            .store
            .find_for_payment(tenant_id, payment_id)?
            .into_iter()
            .map(|record| (record.broker_id().to_string(), record))
            .collect())
    }

    /// Every item must be covered by `inserted` or `existing`
    fn finish(
        &self,
        tenant_id: &str,
        payment_id: &str,
        items: &[&LineItem],
        existing: HashMap<String, Commission>,
        inserted: Vec<Commission>,
    ) -> CommitOutcome {
        let inserted_count = inserted.len();
        let mut inserted: HashMap<String, Commission> = inserted
            .into_iter()
            .map(|record| (record.broker_id().to_string(), record))
            .collect();
        let mut existing = existing;
        let mut outcome = CommitOutcome::empty(payment_id);

        for item in items {
            if let Some(record) = inserted.remove(&item.broker_id) {
                info!(
                    tenant_id,
                    payment_id,
                    broker_id = %item.broker_id,
                    commission_id = record.id(),
                    amount = record.commission_amount(),
                    "Commission recorded"
                );
                self.events.log(LedgerEvent::CommissionRecorded {
                    tenant_id: tenant_id.to_string(),
                    payment_id: payment_id.to_string(),
                    broker_id: item.broker_id.clone(),
                    commission_id: record.id().to_string(),
                    amount: record.commission_amount(),
                });
                outcome.records.push(record);
            } else if let Some(record) = existing.remove(&item.broker_id) {
                info!(
                    tenant_id,
                    payment_id,
                    broker_id = %item.broker_id,
                    commission_id = record.id(),
                    "Commission already recorded; skipping"
                );
                self.events.log(LedgerEvent::DuplicateSkipped {
                    tenant_id: tenant_id.to_string(),
                    payment_id: payment_id.to_string(),
                    broker_id: item.broker_id.clone(),
                    existing_commission_id: record.id().to_string(),
                });
                outcome.skipped += 1;
                outcome.records.push(record);
            }
        }

        outcome.inserted = inserted_count;
        outcome
    }

    /// Records for `broker_id`, newest first, optionally filtered by status
    pub fn list_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>, CommissionError> {
        Ok(self.store.list_for_broker(tenant_id, broker_id, status)?)
    }

    /// Records already persisted for `payment_id`
    pub fn for_payment(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Vec<Commission>, CommissionError> {
        Ok(self.store.find_for_payment(tenant_id, payment_id)?)
    }

    pub fn summary_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
    ) -> Result<BrokerCommissionSummary, CommissionError> {
        let mut summary = BrokerCommissionSummary {
            broker_id: broker_id.to_string(),
            ..Default::default()
        };
        for record in self.store.list_for_broker(tenant_id, broker_id, None)? {
            let totals = summary.totals_mut(record.status());
            totals.count += 1;
            totals.amount = totals.amount.saturating_add(record.commission_amount());
        }
        Ok(summary)
    }

    /// Apply an administrative status change
    ///
    /// Only PENDING→APPROVED, APPROVED→PAID and PENDING/APPROVED→REJECTED
    /// are accepted.
    pub fn transition(
        &self,
        tenant_id: &str,
        commission_id: &str,
        next: CommissionStatus,
    ) -> Result<Commission, CommissionError> {
        let current = self
            .store
            .get(tenant_id, commission_id)?
            .ok_or_else(|| CommissionError::not_found(EntityKind::Commission, commission_id))?;

        let from = current.status();
        if !from.can_transition_to(next) {
            return Err(CommissionError::IllegalTransition {
                commission_id: commission_id.to_string(),
                from,
                to: next,
            });
        }

        let updated = self
            .store
            .update_status(tenant_id, commission_id, from, next)?;

        info!(tenant_id, commission_id, from = %from, to = %next, "Commission status changed");
        self.events.log(LedgerEvent::StatusChanged {
            tenant_id: tenant_id.to_string(),
            commission_id: commission_id.to_string(),
            from,
            to: next,
        });

        Ok(updated)
    }
}
