//! Domain models for the commission engine

pub mod broker;
pub mod commission;
pub mod payment;
pub mod rule;

// Re-exports
pub use broker::Broker;
pub use commission::{Commission, CommissionSnapshot, CommissionStatus, LineItem};
pub use payment::{Payment, PaymentStatus, Student};
pub use rule::{CommissionRule, DateRange, RuleConditions, RuleError};
