//! In-memory store implementations
//!
//! Thread-safe (interior `RwLock`/`Mutex`) so a single instance can be shared
//! behind an `Arc` by concurrent calculations and commits. The commission
//! store keeps a unique index on (tenant, payment, broker) and checks a whole
//! batch against it before writing anything.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::broker::Broker;
use crate::models::commission::{Commission, CommissionStatus};
use crate::models::payment::{Payment, Student};
use crate::models::rule::CommissionRule;
use crate::rules::precedence;
use crate::store::{
    BrokerDirectory, CommissionStore, DirectoryError, PaymentSource, RuleStore, StoreError,
};

fn poisoned(what: &str) -> StoreError {
    StoreError::Unavailable(format!("{} lock poisoned", what))
}

// ============================================================================
// Broker directory
// ============================================================================

/// Broker directory keyed by tenant, then broker id
#[derive(Debug, Default)]
pub struct InMemoryBrokerDirectory {
    tenants: RwLock<HashMap<String, BTreeMap<String, Broker>>>,
}

impl InMemoryBrokerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, BTreeMap<String, Broker>>>, StoreError> {
        self.tenants.read().map_err(|_| poisoned("broker directory"))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, BTreeMap<String, Broker>>>, StoreError> {
        self.tenants.write().map_err(|_| poisoned("broker directory"))
    }

    /// Register a new broker, deriving its level from `parent_id`
    ///
    /// The parent must already exist in the same tenant, so the parent
    /// relation stays acyclic by construction.
    ///
    /// # Example
    /// ```
    /// use commission_engine_core_rs::store::InMemoryBrokerDirectory;
    ///
    /// let directory = InMemoryBrokerDirectory::new();
    /// directory.register("school-1", "b-top", "Top", "TOP", None).unwrap();
    /// let sub = directory
    ///     .register("school-1", "b-sub", "Sub", "SUB", Some("b-top"))
    ///     .unwrap();
    /// assert_eq!(sub.level(), 1);
    ///
    /// // Unknown parent
    /// assert!(directory
    ///     .register("school-1", "b-x", "X", "X", Some("nope"))
    ///     .is_err());
    /// ```
    pub fn register(
        &self,
        tenant_id: &str,
        id: &str,
        name: &str,
        code: &str,
        parent_id: Option<&str>,
    ) -> Result<Broker, DirectoryError> {
        let mut tenants = self.write()?;

        if tenants.values().any(|brokers| brokers.contains_key(id)) {
            return Err(DirectoryError::DuplicateId(id.to_string()));
        }

        let broker = match parent_id {
            None => Broker::root(id, tenant_id, name, code),
            Some(parent_id) => {
                let parent = tenants
                    .get(tenant_id)
                    .and_then(|brokers| brokers.get(parent_id));
                match parent {
                    Some(parent) => Broker::child_of(parent, id, name, code)
                        .ok_or_else(|| DirectoryError::LevelOverflow(parent_id.to_string()))?,
                    None => {
                        let elsewhere = tenants
                            .iter()
                            .any(|(tenant, brokers)| tenant != tenant_id && brokers.contains_key(parent_id));
                        return Err(if elsewhere {
                            DirectoryError::CrossTenantParent {
                                parent_id: parent_id.to_string(),
                                tenant_id: tenant_id.to_string(),
                            }
                        } else {
                            DirectoryError::ParentNotFound(parent_id.to_string())
                        });
                    }
                }
            }
        };

        let brokers = tenants.entry(tenant_id.to_string()).or_default();
        if brokers.values().any(|existing| existing.code() == code) {
            return Err(DirectoryError::DuplicateCode {
                code: code.to_string(),
                tenant_id: tenant_id.to_string(),
            });
        }

        brokers.insert(id.to_string(), broker.clone());
        Ok(broker)
    }

    /// Store a broker exactly as given, bypassing registration checks
    ///
    /// Mirrors loading persisted rows; used to reproduce corrupted data.
    pub fn load(&self, broker: Broker) -> Result<(), StoreError> {
        let mut tenants = self.write()?;
        tenants
            .entry(broker.tenant_id().to_string())
            .or_default()
            .insert(broker.id().to_string(), broker);
        Ok(())
    }

    /// Soft-deactivate a broker; records referencing it are untouched
    pub fn deactivate(&self, tenant_id: &str, broker_id: &str) -> Result<(), DirectoryError> {
        let mut tenants = self.write()?;
        let broker = tenants
            .get_mut(tenant_id)
            .and_then(|brokers| brokers.get_mut(broker_id))
            .ok_or_else(|| DirectoryError::BrokerNotFound(broker_id.to_string()))?;
        broker.deactivate();
        Ok(())
    }
}

impl BrokerDirectory for InMemoryBrokerDirectory {
    fn broker(&self, tenant_id: &str, broker_id: &str) -> Result<Option<Broker>, StoreError> {
        Ok(self
            .read()?
            .get(tenant_id)
            .and_then(|brokers| brokers.get(broker_id))
            .cloned())
    }

    fn children(&self, tenant_id: &str, broker_id: &str) -> Result<Vec<Broker>, StoreError> {
        Ok(self
            .read()?
            .get(tenant_id)
            .map(|brokers| {
                brokers
                    .values()
                    .filter(|b| b.parent_id() == Some(broker_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn brokers_for_tenant(&self, tenant_id: &str) -> Result<Vec<Broker>, StoreError> {
        Ok(self
            .read()?
            .get(tenant_id)
            .map(|brokers| brokers.values().cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// Rule store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<Vec<CommissionRule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, replacing any rule with the same id
    pub fn upsert(&self, rule: CommissionRule) -> Result<(), StoreError> {
        let mut rules = self.rules.write().map_err(|_| poisoned("rule store"))?;
        match rules.iter_mut().find(|r| r.id() == rule.id()) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Ok(())
    }

    pub fn deactivate(&self, tenant_id: &str, rule_id: &str) -> Result<(), StoreError> {
        let mut rules = self.rules.write().map_err(|_| poisoned("rule store"))?;
        let rule = rules
            .iter_mut()
            .find(|r| r.tenant_id() == tenant_id && r.id() == rule_id)
            .ok_or_else(|| StoreError::MissingRecord(rule_id.to_string()))?;
        rule.deactivate();
        Ok(())
    }
}

impl RuleStore for InMemoryRuleStore {
    fn active_rules_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
    ) -> Result<Vec<CommissionRule>, StoreError> {
        let rules = self.rules.read().map_err(|_| poisoned("rule store"))?;
        let mut active: Vec<CommissionRule> = rules
            .iter()
            .filter(|r| r.tenant_id() == tenant_id && r.broker_id() == broker_id && r.is_active())
            .cloned()
            .collect();
        active.sort_by(precedence);
        Ok(active)
    }
}

// ============================================================================
// Payment source
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPaymentSource {
    payments: RwLock<HashMap<(String, String), Payment>>,
    students: RwLock<HashMap<(String, String), Student>>,
}

impl InMemoryPaymentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_payment(&self, payment: Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.write().map_err(|_| poisoned("payment source"))?;
        payments.insert((payment.tenant_id.clone(), payment.id.clone()), payment);
        Ok(())
    }

    pub fn add_student(&self, student: Student) -> Result<(), StoreError> {
        let mut students = self.students.write().map_err(|_| poisoned("payment source"))?;
        students.insert((student.tenant_id.clone(), student.id.clone()), student);
        Ok(())
    }
}

impl PaymentSource for InMemoryPaymentSource {
    fn payment(&self, tenant_id: &str, payment_id: &str) -> Result<Option<Payment>, StoreError> {
        let payments = self.payments.read().map_err(|_| poisoned("payment source"))?;
        Ok(payments
            .get(&(tenant_id.to_string(), payment_id.to_string()))
            .cloned())
    }

    fn student(&self, tenant_id: &str, student_id: &str) -> Result<Option<Student>, StoreError> {
        let students = self.students.read().map_err(|_| poisoned("payment source"))?;
        Ok(students
            .get(&(tenant_id.to_string(), student_id.to_string()))
            .cloned())
    }
}

// ============================================================================
// Commission store
// ============================================================================

type NaturalKey = (String, String, String);

fn natural_key(record: &Commission) -> NaturalKey {
    (
        record.tenant_id().to_string(),
        record.payment_id().to_string(),
        record.broker_id().to_string(),
    )
}

#[derive(Debug, Default)]
struct CommissionTable {
    /// Insertion order
    records: Vec<Commission>,

    /// Unique index on (tenant, payment, broker)
    keys: HashSet<NaturalKey>,
}

/// Commission records with an all-or-nothing batch insert
#[derive(Debug, Default)]
pub struct InMemoryCommissionStore {
    table: Mutex<CommissionTable>,
}

impl InMemoryCommissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CommissionTable>, StoreError> {
        self.table.lock().map_err(|_| poisoned("commission store"))
    }

    /// Total number of stored records across all tenants
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl CommissionStore for InMemoryCommissionStore {
    fn find_for_payment(
        &self,
        tenant_id: &str,
        payment_id: &str,
    ) -> Result<Vec<Commission>, StoreError> {
        Ok(self
            .lock()?
            .records
            .iter()
            .filter(|r| r.tenant_id() == tenant_id && r.payment_id() == payment_id)
            .cloned()
            .collect())
    }

    fn insert_batch(&self, records: Vec<Commission>) -> Result<(), StoreError> {
        let mut table = self.lock()?;

        // Validate the whole batch before touching the table
        let mut batch_keys = HashSet::with_capacity(records.len());
        for record in &records {
            let key = natural_key(record);
            if table.keys.contains(&key) || !batch_keys.insert(key) {
                return Err(StoreError::UniqueViolation {
                    payment_id: record.payment_id().to_string(),
                    broker_id: record.broker_id().to_string(),
                });
            }
        }

        table.keys.extend(batch_keys);
        table.records.extend(records);
        Ok(())
    }

    fn get(&self, tenant_id: &str, commission_id: &str) -> Result<Option<Commission>, StoreError> {
        Ok(self
            .lock()?
            .records
            .iter()
            .find(|r| r.tenant_id() == tenant_id && r.id() == commission_id)
            .cloned())
    }

    fn list_for_broker(
        &self,
        tenant_id: &str,
        broker_id: &str,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>, StoreError> {
        let table = self.lock()?;
        // Reverse insertion order first so the stable sort keeps later
        // inserts ahead of earlier ones with the same timestamp
        let mut records: Vec<Commission> = table
            .records
            .iter()
            .rev()
            .filter(|r| r.tenant_id() == tenant_id && r.broker_id() == broker_id)
            .filter(|r| status.map_or(true, |s| r.status() == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(records)
    }

    fn update_status(
        &self,
        tenant_id: &str,
        commission_id: &str,
        expected: CommissionStatus,
        next: CommissionStatus,
    ) -> Result<Commission, StoreError> {
        let mut table = self.lock()?;
        let record = table
            .records
            .iter_mut()
            .find(|r| r.tenant_id() == tenant_id && r.id() == commission_id)
            .ok_or_else(|| StoreError::MissingRecord(commission_id.to_string()))?;

        if record.status() != expected {
            return Err(StoreError::StaleRecord(commission_id.to_string()));
        }

        *record = record.with_status(next);
        Ok(record.clone())
    }
}
