//! In-memory broker index for one tenant
//!
//! Loading a tenant's brokers once and walking them in memory avoids one
//! directory round trip per hierarchy level when many payments are
//! calculated together.

use std::collections::{BTreeMap, HashMap};

use crate::models::broker::Broker;
use crate::store::{BrokerDirectory, StoreError};

/// Point-in-time copy of one tenant's broker tree
#[derive(Debug, Clone)]
pub struct HierarchySnapshot {
    tenant_id: String,

    brokers: BTreeMap<String, Broker>,

    /// parent id -> child ids, in id order
    children: HashMap<String, Vec<String>>,
}

impl HierarchySnapshot {
    /// Load every broker of `tenant_id` from `directory`
    pub fn load(directory: &dyn BrokerDirectory, tenant_id: &str) -> Result<Self, StoreError> {
        Ok(Self::from_brokers(
            tenant_id,
            directory.brokers_for_tenant(tenant_id)?,
        ))
    }

    /// Build from an explicit broker list; brokers of other tenants are dropped
    pub fn from_brokers(tenant_id: &str, brokers: Vec<Broker>) -> Self {
        let brokers: BTreeMap<String, Broker> = brokers
            .into_iter()
            .filter(|b| b.tenant_id() == tenant_id)
            .map(|b| (b.id().to_string(), b))
            .collect();

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for broker in brokers.values() {
            if let Some(parent_id) = broker.parent_id() {
                children
                    .entry(parent_id.to_string())
                    .or_default()
                    .push(broker.id().to_string());
            }
        }

        Self {
            tenant_id: tenant_id.to_string(),
            brokers,
            children,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn len(&self) -> usize {
        self.brokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }

    /// Brokers without a parent
    pub fn roots(&self) -> Vec<&Broker> {
        self.brokers.values().filter(|b| b.is_root()).collect()
    }
}

impl BrokerDirectory for HierarchySnapshot {
    fn broker(&self, tenant_id: &str, broker_id: &str) -> Result<Option<Broker>, StoreError> {
        if tenant_id != self.tenant_id {
            return Ok(None);
        }
        Ok(self.brokers.get(broker_id).cloned())
    }

    fn children(&self, tenant_id: &str, broker_id: &str) -> Result<Vec<Broker>, StoreError> {
        if tenant_id != self.tenant_id {
            return Ok(Vec::new());
        }
        Ok(self
            .children
            .get(broker_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.brokers.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn brokers_for_tenant(&self, tenant_id: &str) -> Result<Vec<Broker>, StoreError> {
        if tenant_id != self.tenant_id {
            return Ok(Vec::new());
        }
        Ok(self.brokers.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{ancestor_chain, DEFAULT_MAX_DEPTH};
    use crate::store::InMemoryBrokerDirectory;

    fn directory() -> InMemoryBrokerDirectory {
        let directory = InMemoryBrokerDirectory::new();
        directory.register("t1", "top", "Top", "TOP", None).unwrap();
        directory.register("t1", "sub", "Sub", "SUB", Some("top")).unwrap();
        directory.register("t1", "agent", "Agent", "AGT", Some("sub")).unwrap();
        directory.register("t2", "other", "Other", "OTH", None).unwrap();
        directory
    }

    #[test]
    fn test_snapshot_walk_matches_directory_walk() {
        let directory = directory();
        let snapshot = HierarchySnapshot::load(&directory, "t1").unwrap();

        let live = ancestor_chain(&directory, "t1", "agent", DEFAULT_MAX_DEPTH).unwrap();
        let cached = ancestor_chain(&snapshot, "t1", "agent", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(live, cached);
    }

    #[test]
    fn test_snapshot_is_tenant_scoped() {
        let snapshot = HierarchySnapshot::load(&directory(), "t1").unwrap();

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.broker("t1", "other").unwrap().is_none());
        assert!(snapshot.broker("t2", "top").unwrap().is_none());
        assert_eq!(snapshot.roots().len(), 1);
        assert_eq!(snapshot.children("t1", "top").unwrap()[0].id(), "sub");
    }
}
