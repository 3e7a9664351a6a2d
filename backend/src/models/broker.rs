//! Broker model
//!
//! A broker is a node in a tenant's referral tree. Each broker has:
//! - An optional parent (same tenant)
//! - A level: 0 for roots, parent level + 1 otherwise
//! - An active flag (soft deactivation only, never deleted)
//! - Free-form metadata
//!
//! Levels are derived once, when the broker is created under its parent, and
//! never recomputed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in the referral hierarchy
///
/// # Example
/// ```
/// use commission_engine_core_rs::Broker;
///
/// let top = Broker::root("b-top", "school-1", "Top Broker", "TOP");
/// let sub = Broker::child_of(&top, "b-sub", "Sub Broker", "SUB").unwrap();
///
/// assert_eq!(top.level(), 0);
/// assert_eq!(sub.level(), 1);
/// assert_eq!(sub.parent_id(), Some("b-top"));
/// assert_eq!(sub.tenant_id(), "school-1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    id: String,

    /// Owning tenant
    tenant_id: String,

    /// Display name
    name: String,

    /// Unique per tenant
    code: String,

    parent_id: Option<String>,

    /// 0 = root, +1 per generation
    level: u32,

    active: bool,

    metadata: BTreeMap<String, serde_json::Value>,
}

impl Broker {
    /// Create a root broker (no parent, level 0)
    pub fn root(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            code: code.into(),
            parent_id: None,
            level: 0,
            active: true,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a broker under `parent`, inheriting its tenant and deriving
    /// the level from it
    ///
    /// Returns `None` if the parent's level is already `u32::MAX`.
    pub fn child_of(
        parent: &Broker,
        id: impl Into<String>,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Option<Self> {
        let level = parent.level.checked_add(1)?;
        Some(Self {
            id: id.into(),
            tenant_id: parent.tenant_id.clone(),
            name: name.into(),
            code: code.into(),
            parent_id: Some(parent.id.clone()),
            level,
            active: true,
            metadata: BTreeMap::new(),
        })
    }

    /// Restore a broker exactly as stored, without deriving anything
    ///
    /// Used by storage adapters loading persisted rows. No invariants are
    /// checked here; the hierarchy walker reports inconsistent data.
    #[allow(clippy::too_many_arguments)]
    pub fn from_snapshot(
        id: String,
        tenant_id: String,
        name: String,
        code: String,
        parent_id: Option<String>,
        level: u32,
        active: bool,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name,
            code,
            parent_id,
            level,
            active,
            metadata,
        }
    }

    /// Attach a metadata entry (builder pattern)
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Mark inactive (builder pattern)
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }
}
