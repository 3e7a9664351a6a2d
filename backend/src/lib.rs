//! Commission Engine Core - Rust Engine
//!
//! Hierarchical commission calculation for referral brokers with deterministic,
//! auditable money arithmetic and idempotent persistence.
//!
//! # Architecture
//!
//! - **models**: Domain types (Broker, CommissionRule, Payment, Commission)
//! - **store**: Collaborator ports plus in-memory implementations
//! - **hierarchy**: Ancestor chain walker over the broker tree
//! - **rules**: Rule eligibility and priority-ordered selection
//! - **calculator**: Payment → line items (no persistence)
//! - **ledger**: Atomic, idempotent persistence of line items
//! - **engine**: Facade wiring config and ports together
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (minor currency units)
//! 2. Percentages are exact decimals, never floats
//! 3. At most one commission per (payment, broker)
//! 4. A commit persists every new line item or none of them

// Module declarations
pub mod calculator;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod money;
pub mod rules;
pub mod store;

// Re-exports for convenience
pub use calculator::{Calculation, CommissionCalculator};
pub use config::{ConfigError, EngineConfig, LogFormat};
pub use engine::CommissionEngine;
pub use error::{
    BatchCalculationError, CalculationFailed, CommissionError, CommitFailed, EntityKind,
    IntegrityViolation, ProcessingError,
};
pub use hierarchy::{ancestor_chain, HierarchySnapshot, DEFAULT_MAX_DEPTH};
pub use ledger::{
    BrokerCommissionSummary, CommissionLedger, CommitOutcome, LedgerEvent, LedgerEventLog,
    DEFAULT_EVENT_LOG_CAPACITY,
};
pub use models::{
    broker::Broker,
    commission::{Commission, CommissionSnapshot, CommissionStatus, LineItem},
    payment::{Payment, PaymentStatus, Student},
    rule::{CommissionRule, DateRange, RuleConditions, RuleError},
};
pub use money::{commission_amount, Percentage, PercentageError};
pub use rules::{select_rule, PaymentContext, RuleMatch, UnmetCondition};
pub use store::{
    BrokerDirectory, CommissionStore, DirectoryError, PaymentSource, RuleStore, StoreError,
};
