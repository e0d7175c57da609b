use crate::config::{EngineConfig, RiskThresholds, TransitionPolicy};
use crate::engine::{NewAlert, RiskAlertEngine};
use crate::error::{ConflictKind, EngineError};
use crate::rules::{default_rules, SharpIncreaseRule, ThresholdCrossingRule};
use crate::SupplierRiskRule;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use riskwatch_common::types::{AlertStatus, RiskAlert, Severity, SourceType, UserRef};
use riskwatch_notify::error::NotifyError;
use riskwatch_notify::NotificationDispatcher;
use riskwatch_storage::{AlertDb, AlertFilter, AlertStore, Page, PageRequest};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Wraps the real store and counts writes.
struct CountingStore {
    inner: AlertDb,
    saves: AtomicUsize,
}

impl CountingStore {
    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertStore for CountingStore {
    async fn save(&self, alert: &RiskAlert) -> riskwatch_storage::Result<RiskAlert> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(alert).await
    }

    async fn find_by_id(&self, id: &str) -> riskwatch_storage::Result<Option<RiskAlert>> {
        self.inner.find_by_id(id).await
    }

    async fn find_page(
        &self,
        filter: &AlertFilter,
        page: PageRequest,
    ) -> riskwatch_storage::Result<Page<RiskAlert>> {
        self.inner.find_page(filter, page).await
    }

    async fn find_active_critical(&self) -> riskwatch_storage::Result<Vec<RiskAlert>> {
        self.inner.find_active_critical().await
    }

    async fn count_active_since(&self, since: DateTime<Utc>) -> riskwatch_storage::Result<u64> {
        self.inner.count_active_since(since).await
    }

    async fn count_active_by_severity(&self) -> riskwatch_storage::Result<Vec<(Severity, u64)>> {
        self.inner.count_active_by_severity().await
    }

    async fn find_active_by_source(
        &self,
        alert_type: &str,
        source_type: &SourceType,
        source_id: &str,
    ) -> riskwatch_storage::Result<Option<RiskAlert>> {
        self.inner
            .find_active_by_source(alert_type, source_type, source_id)
            .await
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    dispatched: Mutex<Vec<RiskAlert>>,
}

impl RecordingDispatcher {
    fn ids(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.id.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, alert: &RiskAlert) -> riskwatch_notify::error::Result<()> {
        self.dispatched.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _alert: &RiskAlert) -> riskwatch_notify::error::Result<()> {
        Err(NotifyError::Delivery {
            failed: vec!["ops-webhook".into()],
        })
    }
}

struct Ctx {
    _dir: TempDir,
    store: Arc<CountingStore>,
    dispatcher: Arc<RecordingDispatcher>,
    engine: RiskAlertEngine,
}

async fn setup_with(config: EngineConfig) -> Ctx {
    riskwatch_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let inner = AlertDb::open(&AlertDb::sqlite_url(dir.path()), dir.path())
        .await
        .unwrap();
    let store = Arc::new(CountingStore {
        inner,
        saves: AtomicUsize::new(0),
    });
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let engine = RiskAlertEngine::new(store.clone(), dispatcher.clone(), config);
    Ctx {
        _dir: dir,
        store,
        dispatcher,
        engine,
    }
}

async fn setup() -> Ctx {
    setup_with(EngineConfig::default()).await
}

fn alice() -> UserRef {
    UserRef::from("alice")
}

// ---- rules ----

#[test]
fn threshold_crossing_rule_fires_only_on_crossing() {
    let rule = ThresholdCrossingRule { threshold: 75 };
    let finding = rule.evaluate(80, Some(70)).unwrap();
    assert_eq!(finding.alert_type, "SUPPLIER_HIGH_RISK");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(
        finding.description,
        "Supplier risk score has increased above the critical threshold of 75"
    );

    assert!(rule.evaluate(80, None).is_some());
    assert!(rule.evaluate(80, Some(75)).is_some());
    assert!(rule.evaluate(80, Some(76)).is_none());
    assert!(rule.evaluate(75, Some(10)).is_none());
}

#[test]
fn sharp_increase_rule_needs_previous_score() {
    let rule = SharpIncreaseRule {
        floor: 50,
        min_increase: 15,
    };
    let finding = rule.evaluate(60, Some(40)).unwrap();
    assert_eq!(finding.alert_type, "SUPPLIER_RISK_INCREASE");
    assert_eq!(finding.severity, Severity::Medium);

    assert!(rule.evaluate(60, None).is_none());
    assert!(rule.evaluate(55, Some(45)).is_none());
    assert!(rule.evaluate(60, Some(45)).is_none());
    assert!(rule.evaluate(50, Some(10)).is_none());
}

#[test]
fn default_rules_follow_configured_thresholds() {
    let rules = default_rules(&RiskThresholds {
        high_risk: 90,
        increase_floor: 30,
        increase_delta: 5,
    });
    let ids: Vec<&str> = rules.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["threshold-crossing", "sharp-increase"]);
    assert!(rules[0].evaluate(85, None).is_none());
    assert!(rules[1].evaluate(40, Some(30)).is_some());
}

// ---- creation ----

#[tokio::test]
async fn new_alert_is_active_with_no_transition_fields() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert("PORT_CONGESTION", Severity::Low, "Port congestion", "Delays expected", None, None)
        .await
        .unwrap();

    assert_eq!(alert.status, AlertStatus::Active);
    assert!(!alert.id.is_empty());
    assert!(alert.acknowledged_by.is_none() && alert.acknowledged_at.is_none());
    assert!(alert.resolved_by.is_none() && alert.resolved_at.is_none());
    assert!(alert.resolution_notes.is_none());
    assert!(alert.dismissed_by.is_none() && alert.dismissed_at.is_none());

    let stored = ctx.engine.get_alert(&alert.id).await.unwrap().unwrap();
    assert_eq!(stored.id, alert.id);
    assert_eq!(stored.status, AlertStatus::Active);
    assert_eq!(stored.version, 1);
    assert_eq!(stored.title, "Port congestion");
}

#[tokio::test]
async fn only_high_and_critical_are_dispatched_once() {
    let ctx = setup().await;
    let mut expected = Vec::new();
    for severity in Severity::ALL {
        let alert = ctx
            .engine
            .create_alert("GENERIC", severity, "t", "d", None, None)
            .await
            .unwrap();
        if severity >= Severity::High {
            expected.push(alert.id);
        }
    }
    assert_eq!(ctx.dispatcher.ids(), expected);
}

#[tokio::test]
async fn create_alert_with_carries_assessment_and_actions() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert_with(
            NewAlert::new("SUPPLIER_FINANCIAL", Severity::Medium, "Credit downgrade", "Rating cut")
                .source(SourceType::Supplier, "sup-9")
                .impact_assessment("Two product lines affected")
                .recommended_actions(vec!["Qualify backup supplier".into()]),
        )
        .await
        .unwrap();

    let stored = ctx.engine.get_alert(&alert.id).await.unwrap().unwrap();
    assert_eq!(
        stored.impact_assessment.as_deref(),
        Some("Two product lines affected")
    );
    assert_eq!(stored.recommended_actions, vec!["Qualify backup supplier"]);
    assert_eq!(stored.source_id.as_deref(), Some("sup-9"));
}

#[tokio::test]
async fn empty_title_is_rejected_without_writing() {
    let ctx = setup().await;
    let err = ctx
        .engine
        .create_alert("GENERIC", Severity::High, "  ", "d", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(ctx.store.saves(), 0);
    assert!(ctx.dispatcher.ids().is_empty());
}

#[tokio::test]
async fn supplier_alert_attaches_score_with_second_save() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_supplier_alert("sup-1", "SUPPLIER_HIGH_RISK", Severity::High, "t", "d", 88)
        .await
        .unwrap();

    assert_eq!(alert.risk_score, Some(88));
    assert_eq!(alert.version, 2);
    assert_eq!(ctx.store.saves(), 2);
    assert_eq!(alert.source_type, Some(SourceType::Supplier));

    // Dispatched before the score was attached.
    let dispatched = ctx.dispatcher.dispatched.lock().unwrap();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].risk_score, None);
}

#[tokio::test]
async fn risk_score_is_one_shot_and_supplier_only() {
    let ctx = setup().await;
    let supplier = ctx
        .engine
        .create_supplier_alert("sup-1", "SUPPLIER_HIGH_RISK", Severity::Low, "t", "d", 40)
        .await
        .unwrap();
    let err = ctx
        .engine
        .attach_risk_score(&supplier.id, 41)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let shipment = ctx
        .engine
        .create_shipment_alert("shp-3", "SHIPMENT_DELAY", Severity::Medium, "t", "d")
        .await
        .unwrap();
    assert_eq!(shipment.source_type, Some(SourceType::Shipment));
    assert_eq!(shipment.risk_score, None);
    let err = ctx
        .engine
        .attach_risk_score(&shipment.id, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = ctx
        .engine
        .create_supplier_alert("sup-1", "X", Severity::Low, "t", "d", 101)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn dispatch_failure_keeps_persisted_alert() {
    riskwatch_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        AlertDb::open(&AlertDb::sqlite_url(dir.path()), dir.path())
            .await
            .unwrap(),
    );
    let engine = RiskAlertEngine::new(
        store.clone(),
        Arc::new(FailingDispatcher),
        EngineConfig::default(),
    );

    let err = engine
        .create_supplier_alert("sup-2", "SUPPLIER_HIGH_RISK", Severity::Critical, "t", "d", 95)
        .await
        .unwrap_err();
    let alert_id = match err {
        EngineError::Dispatch { alert_id, source } => {
            assert!(matches!(source, NotifyError::Delivery { .. }));
            alert_id
        }
        other => panic!("unexpected error: {other}"),
    };

    let stored = store.find_by_id(&alert_id).await.unwrap().unwrap();
    assert_eq!(stored.status, AlertStatus::Active);
    assert_eq!(stored.risk_score, Some(95));

    // Low severity never reaches the dispatcher.
    engine
        .create_alert("GENERIC", Severity::Low, "t", "d", None, None)
        .await
        .unwrap();
}

// ---- evaluation ----

#[tokio::test]
async fn evaluate_crossing_creates_high_alert() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .evaluate_supplier_risk("sup-1", 80, Some(70))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(alert.alert_type, "SUPPLIER_HIGH_RISK");
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.risk_score, Some(80));
    assert_eq!(alert.title, "Supplier Risk Score Exceeded Threshold");
    assert_eq!(alert.source_id.as_deref(), Some("sup-1"));
    assert_eq!(ctx.dispatcher.ids(), vec![alert.id.clone()]);

    let page = ctx
        .engine
        .list_alerts(&AlertFilter::All, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn evaluate_already_high_creates_nothing() {
    let ctx = setup().await;
    let result = ctx
        .engine
        .evaluate_supplier_risk("sup-1", 80, Some(76))
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(ctx.store.saves(), 0);
}

#[tokio::test]
async fn evaluate_sharp_increase_creates_medium_alert() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .evaluate_supplier_risk("sup-1", 60, Some(40))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(alert.alert_type, "SUPPLIER_RISK_INCREASE");
    assert_eq!(alert.severity, Severity::Medium);
    assert_eq!(alert.risk_score, Some(60));
    assert_eq!(alert.title, "Significant Supplier Risk Increase");
    assert!(ctx.dispatcher.ids().is_empty());
}

#[tokio::test]
async fn evaluate_small_increase_creates_nothing() {
    let ctx = setup().await;
    assert!(ctx
        .engine
        .evaluate_supplier_risk("sup-1", 55, Some(45))
        .await
        .unwrap()
        .is_none());
    assert!(ctx
        .engine
        .evaluate_supplier_risk("sup-1", 60, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn evaluate_rejects_out_of_range_scores() {
    let ctx = setup().await;
    for (current, previous) in [(101, None), (-1, None), (80, Some(120))] {
        let err = ctx
            .engine
            .evaluate_supplier_risk("sup-1", current, previous)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

#[tokio::test]
async fn duplicates_are_recreated_by_default() {
    let ctx = setup().await;
    for _ in 0..2 {
        ctx.engine
            .evaluate_supplier_risk("sup-1", 80, None)
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(ctx.dispatcher.ids().len(), 2);
}

#[tokio::test]
async fn dedup_suppresses_while_active_alert_exists() {
    let ctx = setup_with(EngineConfig {
        dedup_active: true,
        ..EngineConfig::default()
    })
    .await;

    let first = ctx
        .engine
        .evaluate_supplier_risk("sup-1", 80, None)
        .await
        .unwrap()
        .unwrap();
    assert!(ctx
        .engine
        .evaluate_supplier_risk("sup-1", 82, Some(60))
        .await
        .unwrap()
        .is_none());

    // A different supplier is unaffected.
    assert!(ctx
        .engine
        .evaluate_supplier_risk("sup-2", 80, None)
        .await
        .unwrap()
        .is_some());

    // Once resolved, the supplier can alert again.
    ctx.engine
        .resolve(&first.id, &alice(), "Supplier audited")
        .await
        .unwrap();
    assert!(ctx
        .engine
        .evaluate_supplier_risk("sup-1", 80, None)
        .await
        .unwrap()
        .is_some());
}

// ---- transitions ----

#[tokio::test]
async fn acknowledge_sets_user_and_time() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert("GENERIC", Severity::Medium, "t", "d", None, None)
        .await
        .unwrap();

    let acked = ctx.engine.acknowledge(&alert.id, &alice()).await.unwrap();
    assert_eq!(acked.status, AlertStatus::Acknowledged);
    assert_eq!(acked.acknowledged_by, Some(alice()));
    assert!(acked.acknowledged_at.unwrap() >= acked.created_at);
    assert_eq!(acked.created_at, alert.created_at);
    assert_eq!(acked.severity, alert.severity);
}

#[tokio::test]
async fn resolve_sets_all_resolution_fields() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert("GENERIC", Severity::Medium, "t", "d", None, None)
        .await
        .unwrap();
    ctx.engine.acknowledge(&alert.id, &alice()).await.unwrap();

    let resolved = ctx
        .engine
        .resolve(&alert.id, &UserRef::from("bob"), "Backup supplier engaged")
        .await
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.resolved_by, Some(UserRef::from("bob")));
    assert!(resolved.resolved_at.is_some());
    assert_eq!(
        resolved.resolution_notes.as_deref(),
        Some("Backup supplier engaged")
    );
    assert_eq!(resolved.acknowledged_by, Some(alice()));
}

#[tokio::test]
async fn dismiss_records_user() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert("GENERIC", Severity::Low, "t", "d", None, None)
        .await
        .unwrap();

    ctx.engine.dismiss(&alert.id, &alice()).await.unwrap();
    let stored = ctx.engine.get_alert(&alert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AlertStatus::Dismissed);
    assert_eq!(stored.dismissed_by, Some(alice()));
    assert!(stored.dismissed_at.is_some());
}

#[tokio::test]
async fn transitions_on_unknown_id_are_not_found() {
    let ctx = setup().await;

    let err = ctx.engine.acknowledge("missing", &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { ref id } if id == "missing"));
    let err = ctx
        .engine
        .resolve("missing", &alice(), "notes")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    let err = ctx.engine.dismiss("missing", &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    assert_eq!(ctx.store.saves(), 0);
}

#[tokio::test]
async fn strict_policy_rejects_leaving_terminal_state() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert("GENERIC", Severity::Low, "t", "d", None, None)
        .await
        .unwrap();
    ctx.engine.dismiss(&alert.id, &alice()).await.unwrap();
    let saves = ctx.store.saves();

    let err = ctx.engine.acknowledge(&alert.id, &alice()).await.unwrap_err();
    match err {
        EngineError::Conflict { id, kind } => {
            assert_eq!(id, alert.id);
            assert_eq!(
                kind,
                ConflictKind::Transition {
                    from: AlertStatus::Dismissed,
                    to: AlertStatus::Acknowledged,
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx.store.saves(), saves);
}

#[tokio::test]
async fn permissive_policy_applies_any_transition() {
    let ctx = setup_with(EngineConfig {
        transition_policy: TransitionPolicy::Permissive,
        ..EngineConfig::default()
    })
    .await;
    let alert = ctx
        .engine
        .create_alert("GENERIC", Severity::Low, "t", "d", None, None)
        .await
        .unwrap();
    ctx.engine
        .resolve(&alert.id, &alice(), "done")
        .await
        .unwrap();

    let reacked = ctx.engine.acknowledge(&alert.id, &alice()).await.unwrap();
    assert_eq!(reacked.status, AlertStatus::Acknowledged);
}

#[tokio::test]
async fn stale_write_surfaces_as_conflict() {
    let ctx = setup().await;
    let alert = ctx
        .engine
        .create_alert("GENERIC", Severity::Low, "t", "d", None, None)
        .await
        .unwrap();

    // Someone else updates the row after we read it.
    let mut theirs = alert.clone();
    theirs.status = AlertStatus::Acknowledged;
    ctx.store.save(&theirs).await.unwrap();

    let mut ours = alert.clone();
    ours.status = AlertStatus::Dismissed;
    let err: EngineError = ctx.store.save(&ours).await.unwrap_err().into();
    assert!(matches!(
        err,
        EngineError::Conflict {
            kind: ConflictKind::StaleVersion {
                expected: 1,
                actual: 2
            },
            ..
        }
    ));
}

/// Holds every `find_by_id` until `readers` callers have loaded the row, so
/// concurrent transitions all start from the same version.
struct LockstepStore {
    inner: AlertDb,
    reads: tokio::sync::Barrier,
}

#[async_trait]
impl AlertStore for LockstepStore {
    async fn save(&self, alert: &RiskAlert) -> riskwatch_storage::Result<RiskAlert> {
        self.inner.save(alert).await
    }

    async fn find_by_id(&self, id: &str) -> riskwatch_storage::Result<Option<RiskAlert>> {
        let found = self.inner.find_by_id(id).await;
        self.reads.wait().await;
        found
    }

    async fn find_page(
        &self,
        filter: &AlertFilter,
        page: PageRequest,
    ) -> riskwatch_storage::Result<Page<RiskAlert>> {
        self.inner.find_page(filter, page).await
    }

    async fn find_active_critical(&self) -> riskwatch_storage::Result<Vec<RiskAlert>> {
        self.inner.find_active_critical().await
    }

    async fn count_active_since(&self, since: DateTime<Utc>) -> riskwatch_storage::Result<u64> {
        self.inner.count_active_since(since).await
    }

    async fn count_active_by_severity(&self) -> riskwatch_storage::Result<Vec<(Severity, u64)>> {
        self.inner.count_active_by_severity().await
    }

    async fn find_active_by_source(
        &self,
        alert_type: &str,
        source_type: &SourceType,
        source_id: &str,
    ) -> riskwatch_storage::Result<Option<RiskAlert>> {
        self.inner
            .find_active_by_source(alert_type, source_type, source_id)
            .await
    }
}

#[tokio::test]
async fn concurrent_transitions_keep_only_the_winner() {
    riskwatch_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let inner = AlertDb::open(&AlertDb::sqlite_url(dir.path()), dir.path())
        .await
        .unwrap();
    let store = Arc::new(LockstepStore {
        inner,
        reads: tokio::sync::Barrier::new(2),
    });
    let engine = RiskAlertEngine::new(
        store.clone(),
        Arc::new(RecordingDispatcher::default()),
        EngineConfig::default(),
    );

    let alert = engine
        .create_alert("GENERIC", Severity::Low, "t", "d", None, None)
        .await
        .unwrap();
    assert_eq!(alert.version, 1);

    let bob = UserRef::from("bob");
    let alice = alice();
    let (acked, resolved) = tokio::join!(
        engine.acknowledge(&alert.id, &alice),
        engine.resolve(&alert.id, &bob, "fixed upstream"),
    );

    let stored = store.inner.find_by_id(&alert.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);

    let loser = match (acked, resolved) {
        (Ok(winner), Err(loser)) => {
            assert_eq!(stored.status, AlertStatus::Acknowledged);
            assert_eq!(stored.acknowledged_by, winner.acknowledged_by);
            assert!(stored.resolved_by.is_none() && stored.resolution_notes.is_none());
            loser
        }
        (Err(loser), Ok(winner)) => {
            assert_eq!(stored.status, AlertStatus::Resolved);
            assert_eq!(stored.resolved_by, winner.resolved_by);
            assert!(stored.acknowledged_by.is_none() && stored.acknowledged_at.is_none());
            loser
        }
        (a, r) => panic!("expected exactly one winner, got {a:?} / {r:?}"),
    };
    assert!(matches!(
        loser,
        EngineError::Conflict {
            kind: ConflictKind::StaleVersion {
                expected: 1,
                actual: 2
            },
            ..
        }
    ));
}

// ---- queries ----

#[tokio::test]
async fn status_pages_partition_the_full_listing() {
    let ctx = setup().await;
    let mut ids = Vec::new();
    for i in 0..9 {
        let alert = ctx
            .engine
            .create_alert("GENERIC", Severity::Low, &format!("alert {i}"), "d", None, None)
            .await
            .unwrap();
        ids.push(alert.id);
    }
    ctx.engine.acknowledge(&ids[0], &alice()).await.unwrap();
    ctx.engine.acknowledge(&ids[1], &alice()).await.unwrap();
    ctx.engine.resolve(&ids[2], &alice(), "ok").await.unwrap();
    ctx.engine.dismiss(&ids[3], &alice()).await.unwrap();

    let all = ctx
        .engine
        .list_alerts(&AlertFilter::All, PageRequest::new(100, 0))
        .await
        .unwrap();
    assert_eq!(all.total, 9);

    let mut union = HashSet::new();
    for status in AlertStatus::ALL {
        let mut offset = 0;
        loop {
            let page = ctx
                .engine
                .list_alerts(&AlertFilter::Status(status), PageRequest::new(2, offset))
                .await
                .unwrap();
            if page.items.is_empty() {
                break;
            }
            for alert in &page.items {
                assert_eq!(alert.status, status);
                assert!(union.insert(alert.id.clone()));
            }
            offset += 2;
        }
    }
    let all_ids: HashSet<String> = all.items.into_iter().map(|a| a.id).collect();
    assert_eq!(union, all_ids);
}

#[tokio::test]
async fn active_aggregates() {
    let ctx = setup().await;
    let critical = ctx
        .engine
        .create_alert("GENERIC", Severity::Critical, "c", "d", None, None)
        .await
        .unwrap();
    ctx.engine
        .create_alert("GENERIC", Severity::High, "h", "d", None, None)
        .await
        .unwrap();
    let closed = ctx
        .engine
        .create_alert("GENERIC", Severity::Critical, "c2", "d", None, None)
        .await
        .unwrap();
    ctx.engine.dismiss(&closed.id, &alice()).await.unwrap();

    let active_critical = ctx.engine.active_critical_alerts().await.unwrap();
    assert_eq!(active_critical.len(), 1);
    assert_eq!(active_critical[0].id, critical.id);

    assert_eq!(ctx.engine.active_alert_count().await.unwrap(), 2);
    assert_eq!(ctx.engine.active_alert_count_since(7).await.unwrap(), 2);

    let histogram = ctx.engine.active_severity_histogram().await.unwrap();
    assert_eq!(histogram.len(), 4);
    assert_eq!(histogram[&Severity::Low], 0);
    assert_eq!(histogram[&Severity::Medium], 0);
    assert_eq!(histogram[&Severity::High], 1);
    assert_eq!(histogram[&Severity::Critical], 1);
}

#[tokio::test]
async fn oversized_count_window_is_rejected() {
    let ctx = setup().await;
    let err = ctx
        .engine
        .active_alert_count_since(200_000_000)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(ctx.engine.active_alert_count_since(u32::from(u16::MAX)).await.unwrap(), 0);
}
