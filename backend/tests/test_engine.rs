//! End-to-end tests through the engine facade

use std::sync::Arc;

use chrono::NaiveDate;
use commission_engine_core_rs::store::{
    InMemoryBrokerDirectory, InMemoryCommissionStore, InMemoryPaymentSource, InMemoryRuleStore,
};
use commission_engine_core_rs::{
    BatchCalculationError, Broker, BrokerDirectory, CommissionEngine, CommissionError,
    CommissionRule, CommissionStatus, ConfigError, EngineConfig, EntityKind, Payment,
    ProcessingError, RuleConditions, StoreError, Student,
};
use rust_decimal::Decimal;

const TENANT: &str = "school-1";

struct World {
    payments: Arc<InMemoryPaymentSource>,
    store: Arc<InMemoryCommissionStore>,
    engine: CommissionEngine,
}

fn world_with(config: EngineConfig) -> Result<World, ConfigError> {
    let directory = Arc::new(InMemoryBrokerDirectory::new());
    let rules = Arc::new(InMemoryRuleStore::new());
    let payments = Arc::new(InMemoryPaymentSource::new());
    let store = Arc::new(InMemoryCommissionStore::new());

    let top = directory.register(TENANT, "top", "Top", "TOP", None).unwrap();
    let sub = directory.register(TENANT, "sub", "Sub", "SUB", Some("top")).unwrap();
    let agent = directory.register(TENANT, "agent", "Agent", "AGT", Some("sub")).unwrap();

    rules
        .upsert(
            CommissionRule::new("r-agent", &agent, "Agent 5%", Decimal::new(5, 0))
                .unwrap()
                .with_conditions(RuleConditions::default().with_min_amount(50_000))
                .unwrap(),
        )
        .unwrap();
    rules
        .upsert(
            CommissionRule::new("r-sub", &sub, "Sub 3.5%", Decimal::new(35, 1))
                .unwrap()
                .with_conditions(
                    RuleConditions::default()
                        .with_min_amount(10_000)
                        .with_fee_types(["TUITION"]),
                )
                .unwrap(),
        )
        .unwrap();
    rules
        .upsert(CommissionRule::new("r-top", &top, "Top 2%", Decimal::new(2, 0)).unwrap())
        .unwrap();

    payments
        .add_student(Student::new("stu-1", TENANT).referred_by("agent").in_grade("GRADE_5"))
        .unwrap();
    payments.add_student(Student::new("stu-2", TENANT)).unwrap();

    let engine = CommissionEngine::new(
        config,
        directory,
        rules,
        payments.clone(),
        store.clone(),
    )?;

    Ok(World {
        payments,
        store,
        engine,
    })
}

fn world() -> World {
    world_with(EngineConfig::default()).unwrap()
}

impl World {
    fn pay(&self, id: &str, student: &str, amount: i64) {
        self.payments
            .add_payment(Payment::completed(
                id,
                TENANT,
                student,
                amount,
                "TUITION",
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            ))
            .unwrap();
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = EngineConfig {
        max_hierarchy_depth: 0,
        ..EngineConfig::default()
    };
    assert!(matches!(world_with(config), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_calculate_then_commit() {
    let w = world();
    w.pay("pay-1", "stu-1", 50_000);

    let preview = w.engine.calculate(TENANT, "pay-1").unwrap();
    assert_eq!(preview.total_commission(), 5_250);
    // Preview writes nothing
    assert!(w.store.is_empty().unwrap());

    let outcome = w.engine.commit(TENANT, "pay-1", &preview.line_items).unwrap();
    assert_eq!(outcome.inserted, 3);

    // Records carry the preview's digest
    for record in &outcome.records {
        assert_eq!(record.snapshot().calculation_digest, preview.digest());
    }
}

#[test]
fn test_process_payment_is_idempotent() {
    let w = world();
    w.pay("pay-1", "stu-1", 50_000);

    let first = w.engine.process_payment(TENANT, "pay-1").unwrap();
    let second = w.engine.process_payment(TENANT, "pay-1").unwrap();

    assert_eq!(first.inserted, 3);
    assert!(second.is_noop());
    assert_eq!(second.total_commission(), 5_250);
    assert_eq!(w.store.len().unwrap(), 3);
}

#[test]
fn test_no_referrer_commits_nothing() {
    let w = world();
    w.pay("pay-2", "stu-2", 50_000);

    let outcome = w.engine.process_payment(TENANT, "pay-2").unwrap();
    assert!(outcome.records.is_empty());
    assert!(w.store.is_empty().unwrap());
}

#[test]
fn test_process_payment_surfaces_calculation_failure() {
    let w = world();
    let err = w.engine.process_payment(TENANT, "missing").unwrap_err();

    match err {
        ProcessingError::Calculation(failed) => {
            assert_eq!(
                failed.reason,
                CommissionError::not_found(EntityKind::Payment, "missing")
            );
        }
        other => panic!("expected calculation failure, got {:?}", other),
    }
    assert!(w.store.is_empty().unwrap());
}

#[test]
fn test_list_for_broker_after_processing() {
    let w = world();
    w.pay("pay-1", "stu-1", 50_000);
    w.pay("pay-3", "stu-1", 20_000);
    w.engine.process_payment(TENANT, "pay-1").unwrap();
    w.engine.process_payment(TENANT, "pay-3").unwrap();

    let agent = w.engine.list_for_broker(TENANT, "agent", None).unwrap();
    let top = w.engine.list_for_broker(TENANT, "top", None).unwrap();

    // Agent only earned on the 50000 payment
    assert_eq!(agent.len(), 1);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].payment_id(), "pay-3");
    assert_eq!(top[0].commission_amount(), 400);

    let pending = w
        .engine
        .list_for_broker(TENANT, "top", Some(CommissionStatus::Pending))
        .unwrap();
    assert_eq!(pending.len(), 2);
}

#[test]
fn test_calculate_batch_matches_single_calculations() {
    let w = world();
    w.pay("pay-1", "stu-1", 50_000);
    w.pay("pay-3", "stu-1", 20_000);
    w.pay("pay-4", "stu-2", 70_000);

    let batch = w
        .engine
        .calculate_batch(TENANT, &["pay-1", "pay-3", "pay-4"])
        .unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0], w.engine.calculate(TENANT, "pay-1").unwrap());
    assert_eq!(batch[1], w.engine.calculate(TENANT, "pay-3").unwrap());
    assert!(batch[2].is_empty());
}

#[test]
fn test_calculate_batch_stops_at_first_failure() {
    let w = world();
    w.pay("pay-1", "stu-1", 50_000);

    let err = w
        .engine
        .calculate_batch(TENANT, &["pay-1", "ghost"])
        .unwrap_err();
    match err {
        BatchCalculationError::Calculation(failed) => assert_eq!(failed.payment_id, "ghost"),
        other => panic!("expected calculation failure, got {:?}", other),
    }

    assert!(w.engine.calculate_batch(TENANT, &[]).unwrap().is_empty());
}

/// Single lookups work but listing a tenant's brokers fails
struct ListingOutage(InMemoryBrokerDirectory);

impl BrokerDirectory for ListingOutage {
    fn broker(&self, tenant_id: &str, broker_id: &str) -> Result<Option<Broker>, StoreError> {
        self.0.broker(tenant_id, broker_id)
    }

    fn children(&self, tenant_id: &str, broker_id: &str) -> Result<Vec<Broker>, StoreError> {
        self.0.children(tenant_id, broker_id)
    }

    fn brokers_for_tenant(&self, _tenant_id: &str) -> Result<Vec<Broker>, StoreError> {
        Err(StoreError::Unavailable("broker listing timed out".to_string()))
    }
}

#[test]
fn test_calculate_batch_snapshot_failure_names_tenant() {
    let directory = InMemoryBrokerDirectory::new();
    directory.register(TENANT, "top", "Top", "TOP", None).unwrap();
    let engine = CommissionEngine::new(
        EngineConfig::default(),
        Arc::new(ListingOutage(directory)),
        Arc::new(InMemoryRuleStore::new()),
        Arc::new(InMemoryPaymentSource::new()),
        Arc::new(InMemoryCommissionStore::new()),
    )
    .unwrap();

    let err = engine
        .calculate_batch(TENANT, &["pay-1", "pay-2"])
        .unwrap_err();
    assert_eq!(
        err,
        BatchCalculationError::Snapshot {
            tenant_id: TENANT.to_string(),
            reason: StoreError::Unavailable("broker listing timed out".to_string()),
        }
    );
    assert!(!err.to_string().contains("pay-1"));
}

#[test]
fn test_ledger_events_track_processing() {
    let w = world();
    w.pay("pay-1", "stu-1", 50_000);
    w.engine.process_payment(TENANT, "pay-1").unwrap();
    w.engine.process_payment(TENANT, "pay-1").unwrap();

    let events = w.engine.ledger().events().events_for_payment("pay-1");
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec![
            "CommissionRecorded",
            "CommissionRecorded",
            "CommissionRecorded",
            "DuplicateSkipped",
            "DuplicateSkipped",
            "DuplicateSkipped",
        ]
    );
}

#[test]
fn test_config_from_json_drives_engine() {
    let config = EngineConfig::from_json_str(
        r#"{ "max_hierarchy_depth": 2, "log_format": "json" }"#,
    )
    .unwrap();
    let w = world_with(config).unwrap();
    assert_eq!(w.engine.config().max_hierarchy_depth, 2);

    w.pay("pay-1", "stu-1", 50_000);
    // Agent's chain has three brokers
    let err = w.engine.calculate(TENANT, "pay-1").unwrap_err();
    assert!(matches!(err.reason, CommissionError::DataIntegrity(_)));
}
