//! Hierarchy walker
//!
//! Produces a broker's ancestor chain: self → parent → grandparent → … → root.
//!
//! The walk is an explicit loop with a depth bound. Brokers are created under
//! parents that already exist, so a well-formed tree always terminates; the
//! bound and the level check exist to fail loudly on corrupted rows instead
//! of looping.
//!
//! # Critical Invariants
//!
//! 1. **Self-first order**: `chain[0]` is the starting broker, `chain.last()` the root
//! 2. **Length**: for well-formed data, `chain.len() == start.level() + 1`
//! 3. **Levels**: each broker's level is its parent's level + 1; roots are level 0

mod snapshot;

pub use snapshot::HierarchySnapshot;

use crate::error::{CommissionError, EntityKind, IntegrityViolation};
use crate::models::broker::Broker;
use crate::store::BrokerDirectory;

/// Default maximum number of brokers in one chain
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Walk from `broker_id` up to its root
///
/// # Errors
///
/// - `NotFound` if `broker_id` does not exist in the tenant
/// - `DataIntegrity` if a parent link dangles, a level is inconsistent, or
///   the chain would exceed `max_depth` brokers
///
/// # Example
/// ```
/// use commission_engine_core_rs::store::InMemoryBrokerDirectory;
/// use commission_engine_core_rs::ancestor_chain;
///
/// let directory = InMemoryBrokerDirectory::new();
/// directory.register("school-1", "top", "Top", "TOP", None).unwrap();
/// directory.register("school-1", "sub", "Sub", "SUB", Some("top")).unwrap();
/// directory.register("school-1", "agent", "Agent", "AGT", Some("sub")).unwrap();
///
/// let chain = ancestor_chain(&directory, "school-1", "agent", 32).unwrap();
/// let ids: Vec<&str> = chain.iter().map(|b| b.id()).collect();
/// assert_eq!(ids, vec!["agent", "sub", "top"]);
/// ```
pub fn ancestor_chain(
    directory: &dyn BrokerDirectory,
    tenant_id: &str,
    broker_id: &str,
    max_depth: usize,
) -> Result<Vec<Broker>, CommissionError> {
    let mut current = directory
        .broker(tenant_id, broker_id)?
        .ok_or_else(|| CommissionError::not_found(EntityKind::Broker, broker_id))?;

    let mut chain = Vec::new();

    loop {
        if chain.len() >= max_depth {
            return Err(IntegrityViolation::DepthExceeded {
                start: broker_id.to_string(),
                max_depth,
            }
            .into());
        }

        let parent_id = match current.parent_id() {
            Some(parent_id) => parent_id.to_string(),
            None => {
                if current.level() != 0 {
                    return Err(IntegrityViolation::LevelMismatch {
                        broker_id: current.id().to_string(),
                        actual: current.level(),
                        expected: 0,
                    }
                    .into());
                }
                chain.push(current);
                return Ok(chain);
            }
        };

        let parent = directory.broker(tenant_id, &parent_id)?.ok_or_else(|| {
            IntegrityViolation::DanglingParent {
                broker_id: current.id().to_string(),
                parent_id: parent_id.clone(),
            }
        })?;

        let expected = parent.level().checked_add(1).ok_or_else(|| {
            IntegrityViolation::LevelOverflow {
                broker_id: parent.id().to_string(),
                level: parent.level(),
            }
        })?;
        if current.level() != expected {
            return Err(IntegrityViolation::LevelMismatch {
                broker_id: current.id().to_string(),
                actual: current.level(),
                expected,
            }
            .into());
        }

        chain.push(current);
        current = parent;
    }
}
