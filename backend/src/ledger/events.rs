//! Ledger event log
//!
//! Records what each commit actually did, so a fresh insert can be told apart
//! from an idempotent skip after the fact.
//!
//! The log is bounded: once `capacity` events are held, each new event
//! evicts the oldest one. Consumers that need every event call `drain`.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::commission::CommissionStatus;

/// Ledger event capturing one persistence decision
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    /// A new commission record was written
    CommissionRecorded {
        tenant_id: String,
        payment_id: String,
        broker_id: String,
        commission_id: String,
        amount: i64,
    },

    /// A line item already had a record and was not written again
    DuplicateSkipped {
        tenant_id: String,
        payment_id: String,
        broker_id: String,
        existing_commission_id: String,
    },

    /// A batch lost a uniqueness race and was rolled back
    BatchConflict {
        tenant_id: String,
        payment_id: String,
        attempt: usize,
    },

    /// An administrative status change
    StatusChanged {
        tenant_id: String,
        commission_id: String,
        from: CommissionStatus,
        to: CommissionStatus,
    },
}

impl LedgerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::CommissionRecorded { .. } => "CommissionRecorded",
            LedgerEvent::DuplicateSkipped { .. } => "DuplicateSkipped",
            LedgerEvent::BatchConflict { .. } => "BatchConflict",
            LedgerEvent::StatusChanged { .. } => "StatusChanged",
        }
    }

    /// Payment ID if the event relates to a specific payment
    pub fn payment_id(&self) -> Option<&str> {
        match self {
            LedgerEvent::CommissionRecorded { payment_id, .. } => Some(payment_id),
            LedgerEvent::DuplicateSkipped { payment_id, .. } => Some(payment_id),
            LedgerEvent::BatchConflict { payment_id, .. } => Some(payment_id),
            LedgerEvent::StatusChanged { .. } => None,
        }
    }
}

/// Default number of events kept before the oldest are evicted
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;

/// Bounded, thread-safe event log
#[derive(Debug)]
pub struct LedgerEventLog {
    events: Mutex<VecDeque<LedgerEvent>>,
    capacity: usize,
}

impl Default for LedgerEventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl LedgerEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log holding at most `capacity` events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn log(&self, event: LedgerEvent) {
        // A poisoned log only loses diagnostics, never records
        if let Ok(mut events) = self.events.lock() {
            while events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all retained events, oldest first
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return all retained events, oldest first
    pub fn drain(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|mut events| events.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<LedgerEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_payment(&self, payment_id: &str) -> Vec<LedgerEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.payment_id() == Some(payment_id))
            .collect()
    }
}
