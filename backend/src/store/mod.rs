//! Collaborator ports
//!
//! The engine reads brokers, rules, payments and students from stores it does
//! not own, and writes commission records through a transactional store. Every
//! lookup is tenant-scoped.
//!
//! # Critical Invariants
//!
//! 1. **Atomic batches**: `CommissionStore::insert_batch` writes every record or none
//! 2. **Natural key**: at most one record per (tenant, payment, broker)
//! 3. **Conflict reporting**: a batch touching an existing key fails with
//!    `StoreError::UniqueViolation` and writes nothing

pub mod memory;

use thiserror::Error;

use crate::models::broker::Broker;
use crate::models::commission::{Commission, CommissionStatus};
use crate::models::payment::{Payment, Student};
use crate::models::rule::CommissionRule;

pub use memory::{
    InMemoryBrokerDirectory, InMemoryCommissionStore, InMemoryPaymentSource, InMemoryRuleStore,
};

/// Errors reported by storage adapters
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Unique constraint violated: payment {payment_id}, broker {broker_id}")]
    UniqueViolation {
        payment_id: String,
        broker_id: String,
    },

    #[error("Record {0} not found")]
    MissingRecord(String),

    #[error("Record {0} was modified concurrently")]
    StaleRecord(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient failures may succeed on retry; constraint failures will not
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::StaleRecord(_))
    }
}

/// Errors from administrative broker registration
#[derive(Debug, Error, PartialEq)]
pub enum DirectoryError {
    #[error("Parent broker {0} not found")]
    ParentNotFound(String),

    #[error("Parent broker {parent_id} belongs to another tenant than {tenant_id}")]
    CrossTenantParent { parent_id: String, tenant_id: String },

    #[error("Broker code {code} already used in tenant {tenant_id}")]
    DuplicateCode { code: String, tenant_id: String },

    #[error("Broker id {0} already exists")]
    DuplicateId(String),

    #[error("Broker {0} not found")]
    BrokerNotFound(String),

    #[error("Parent broker {0} is already at the deepest representable level")]
    LevelOverflow(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Broker tree lookups
pub trait BrokerDirectory: Send + Sync {
    fn broker(&self, tenant_id: &str, broker_id: &str) -> Result<Option<Broker>, StoreError>;

    fn children(&self, tenant_id: &str, broker_id: &str) -> Result<Vec<Broker>, StoreError>;

    fn brokers_for_tenant(&self, tenant_id: &str) -> Result<Vec<Broker>, StoreError>;

    /// Parent of `broker_id`; None for roots and unknown brokers
    fn parent(&self, tenant_id: &str, broker_id: &str) -> Result<Option<Broker>, StoreError> {
        match self.broker(tenant_id, broker_id)? {
            Some(broker) => match broker.parent_id() {
                Some(parent_id) => self.broker(tenant_id, parent_id),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}

/// Commission rule lookups
pub trait RuleStore: Send + Sync {
    /// Active rules bound to `broker_id`, highest priority first
    fn active_rules_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
    ) -> Result<Vec<CommissionRule>, StoreError>;
}

/// Payment and student lookups (fee-management side)
pub trait PaymentSource: Send + Sync {
    fn payment(&self, tenant_id: &str, payment_id: &str) -> Result<Option<Payment>, StoreError>;

    fn student(&self, tenant_id: &str, student_id: &str) -> Result<Option<Student>, StoreError>;
}

/// Transactional storage for commission records
pub trait CommissionStore: Send + Sync {
    fn find_for_payment(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Vec<Commission>, StoreError>;

    /// Insert all records in one transaction
    ///
    /// Fails with `UniqueViolation` (writing nothing) if any record's
    /// (tenant, payment, broker) key already exists or repeats in the batch.
    fn insert_batch(&self, records: Vec<Commission>) -> Result<(), StoreError>;

    fn get(&self, tenant_id: &str, commission_id: &str) -> Result<Option<Commission>, StoreError>;

    /// Records for a broker, newest first, optionally filtered by status
    fn list_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>, StoreError>;

    /// Compare-and-set status update
    ///
    /// Fails with `StaleRecord` if the stored status is no longer `expected`.
    fn update_status(
        &self,
        tenant_id: &str,
        commission_id: &str,
        expected: CommissionStatus,
        next: CommissionStatus,
    ) -> Result<Commission, StoreError>;
}
