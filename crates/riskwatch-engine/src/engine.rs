use crate::config::{EngineConfig, TransitionPolicy};
use crate::error::{ConflictKind, EngineError, Result};
use crate::rules::default_rules;
use crate::SupplierRiskRule;
use chrono::{TimeDelta, Utc};
use riskwatch_common::types::{AlertStatus, RiskAlert, Severity, SourceType, UserRef};
use riskwatch_notify::NotificationDispatcher;
use riskwatch_storage::{AlertFilter, AlertStore, Page, PageRequest};
use std::collections::BTreeMap;
use std::sync::Arc;

const MIN_SCORE: i32 = 0;
const MAX_SCORE: i32 = 100;

/// Input for [`RiskAlertEngine::create_alert_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub source_type: Option<SourceType>,
    pub source_id: Option<String>,
    pub impact_assessment: Option<String>,
    pub recommended_actions: Vec<String>,
}

impl NewAlert {
    pub fn new(
        alert_type: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            alert_type: alert_type.into(),
            severity,
            title: title.into(),
            description: description.into(),
            source_type: None,
            source_id: None,
            impact_assessment: None,
            recommended_actions: Vec::new(),
        }
    }

    pub fn source(mut self, source_type: SourceType, source_id: impl Into<String>) -> Self {
        self.source_type = Some(source_type);
        self.source_id = Some(source_id.into());
        self
    }

    pub fn impact_assessment(mut self, assessment: impl Into<String>) -> Self {
        self.impact_assessment = Some(assessment.into());
        self
    }

    pub fn recommended_actions(mut self, actions: Vec<String>) -> Self {
        self.recommended_actions = actions;
        self
    }
}

pub struct RiskAlertEngine {
    store: Arc<dyn AlertStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    rules: Vec<Box<dyn SupplierRiskRule>>,
    config: EngineConfig,
}

impl RiskAlertEngine {
    /// Builds an engine with the built-in supplier rules configured from
    /// `config.thresholds`.
    pub fn new(
        store: Arc<dyn AlertStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: EngineConfig,
    ) -> Self {
        let rules = default_rules(&config.thresholds);
        Self::with_rules(store, dispatcher, rules, config)
    }

    pub fn with_rules(
        store: Arc<dyn AlertStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        rules: Vec<Box<dyn SupplierRiskRule>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            rules,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Box<dyn SupplierRiskRule>] {
        &self.rules
    }

    // ---- creation ----

    pub async fn create_alert(
        &self,
        alert_type: &str,
        severity: Severity,
        title: &str,
        description: &str,
        source_type: Option<SourceType>,
        source_id: Option<String>,
    ) -> Result<RiskAlert> {
        let mut new = NewAlert::new(alert_type, severity, title, description);
        new.source_type = source_type;
        new.source_id = source_id;
        self.create_alert_with(new).await
    }

    /// Persists a new ACTIVE alert and dispatches it when severity is HIGH
    /// or above. A dispatch failure is reported as
    /// [`EngineError::Dispatch`]; the alert stays persisted.
    pub async fn create_alert_with(&self, new: NewAlert) -> Result<RiskAlert> {
        let alert = self.persist_new(new).await?;
        self.notify(&alert).await?;
        Ok(alert)
    }

    /// Creates a supplier-sourced alert, dispatches it, then attaches
    /// `risk_score` with a second save.
    pub async fn create_supplier_alert(
        &self,
        supplier_id: &str,
        alert_type: &str,
        severity: Severity,
        title: &str,
        description: &str,
        risk_score: i32,
    ) -> Result<RiskAlert> {
        validate_score("risk_score", risk_score)?;
        let new = NewAlert::new(alert_type, severity, title, description)
            .source(SourceType::Supplier, supplier_id);

        let alert = self.persist_new(new).await?;
        let dispatched = self.notify(&alert).await;
        let alert = self.apply_risk_score(alert, risk_score).await?;
        dispatched?;
        Ok(alert)
    }

    pub async fn create_shipment_alert(
        &self,
        shipment_id: &str,
        alert_type: &str,
        severity: Severity,
        title: &str,
        description: &str,
    ) -> Result<RiskAlert> {
        let new = NewAlert::new(alert_type, severity, title, description)
            .source(SourceType::Shipment, shipment_id);
        self.create_alert_with(new).await
    }

    /// One-shot attach of a risk score to a supplier alert.
    pub async fn attach_risk_score(&self, alert_id: &str, risk_score: i32) -> Result<RiskAlert> {
        validate_score("risk_score", risk_score)?;
        let alert = self.load(alert_id).await?;
        self.apply_risk_score(alert, risk_score).await
    }

    async fn persist_new(&self, new: NewAlert) -> Result<RiskAlert> {
        if new.alert_type.trim().is_empty() {
            return Err(EngineError::Validation("alert_type must not be empty".into()));
        }
        if new.title.trim().is_empty() {
            return Err(EngineError::Validation("title must not be empty".into()));
        }

        let mut alert = RiskAlert::new(
            new.alert_type,
            new.severity,
            new.title,
            new.description,
            Utc::now(),
        );
        alert.source_type = new.source_type;
        alert.source_id = new.source_id;
        alert.impact_assessment = new.impact_assessment;
        alert.recommended_actions = new.recommended_actions;

        let saved = self.store.save(&alert).await?;
        tracing::info!(
            alert_id = %saved.id,
            alert_type = %saved.alert_type,
            severity = %saved.severity,
            source_type = saved.source_type.as_ref().map(|s| s.as_str()).unwrap_or("-"),
            source_id = saved.source_id.as_deref().unwrap_or("-"),
            "Risk alert created"
        );
        Ok(saved)
    }

    async fn notify(&self, alert: &RiskAlert) -> Result<()> {
        if !alert.severity.requires_notification() {
            return Ok(());
        }
        self.dispatcher.dispatch(alert).await.map_err(|source| {
            tracing::error!(
                alert_id = %alert.id,
                error = %source,
                "Risk alert notification failed"
            );
            EngineError::Dispatch {
                alert_id: alert.id.clone(),
                source,
            }
        })
    }

    async fn apply_risk_score(&self, mut alert: RiskAlert, risk_score: i32) -> Result<RiskAlert> {
        if !alert.is_supplier_alert() {
            return Err(EngineError::Validation(format!(
                "alert {} is not supplier-sourced; risk score not allowed",
                alert.id
            )));
        }
        if alert.risk_score.is_some() {
            return Err(EngineError::Validation(format!(
                "alert {} already has a risk score",
                alert.id
            )));
        }
        alert.risk_score = Some(risk_score);
        alert.updated_at = Utc::now();
        Ok(self.store.save(&alert).await?)
    }

    // ---- evaluation ----

    /// Runs the supplier rules against a score change and creates the alert
    /// of the first matching rule.
    pub async fn evaluate_supplier_risk(
        &self,
        supplier_id: &str,
        current_score: i32,
        previous_score: Option<i32>,
    ) -> Result<Option<RiskAlert>> {
        validate_score("current_score", current_score)?;
        if let Some(previous) = previous_score {
            validate_score("previous_score", previous)?;
        }

        let matched = self.rules.iter().find_map(|rule| {
            rule.evaluate(current_score, previous_score)
                .map(|finding| (rule.id(), finding))
        });
        let Some((rule_id, finding)) = matched else {
            tracing::debug!(
                supplier_id,
                current_score,
                previous_score,
                "No supplier risk rule matched"
            );
            return Ok(None);
        };

        if self.config.dedup_active {
            let existing = self
                .store
                .find_active_by_source(&finding.alert_type, &SourceType::Supplier, supplier_id)
                .await?;
            if let Some(existing) = existing {
                tracing::info!(
                    supplier_id,
                    rule = rule_id,
                    existing_alert_id = %existing.id,
                    "Supplier risk alert suppressed (active alert exists)"
                );
                return Ok(None);
            }
        }

        tracing::info!(
            supplier_id,
            rule = rule_id,
            current_score,
            previous_score,
            "Supplier risk rule matched"
        );
        self.create_supplier_alert(
            supplier_id,
            &finding.alert_type,
            finding.severity,
            &finding.title,
            &finding.description,
            current_score,
        )
        .await
        .map(Some)
    }

    // ---- transitions ----

    pub async fn acknowledge(&self, alert_id: &str, user: &UserRef) -> Result<RiskAlert> {
        let mut alert = self.load(alert_id).await?;
        self.check_transition(&alert, AlertStatus::Acknowledged)?;

        let now = Utc::now().max(alert.created_at);
        alert.status = AlertStatus::Acknowledged;
        alert.acknowledged_by = Some(user.clone());
        alert.acknowledged_at = Some(now);
        alert.updated_at = now;

        let saved = self.store.save(&alert).await?;
        tracing::info!(alert_id = %saved.id, user = %user, "Risk alert acknowledged");
        Ok(saved)
    }

    pub async fn resolve(
        &self,
        alert_id: &str,
        user: &UserRef,
        resolution_notes: &str,
    ) -> Result<RiskAlert> {
        let mut alert = self.load(alert_id).await?;
        self.check_transition(&alert, AlertStatus::Resolved)?;

        let now = Utc::now().max(alert.created_at);
        alert.status = AlertStatus::Resolved;
        alert.resolved_by = Some(user.clone());
        alert.resolved_at = Some(now);
        alert.resolution_notes = Some(resolution_notes.to_string());
        alert.updated_at = now;

        let saved = self.store.save(&alert).await?;
        tracing::info!(alert_id = %saved.id, user = %user, "Risk alert resolved");
        Ok(saved)
    }

    pub async fn dismiss(&self, alert_id: &str, user: &UserRef) -> Result<()> {
        let mut alert = self.load(alert_id).await?;
        self.check_transition(&alert, AlertStatus::Dismissed)?;

        let now = Utc::now().max(alert.created_at);
        alert.status = AlertStatus::Dismissed;
        alert.dismissed_by = Some(user.clone());
        alert.dismissed_at = Some(now);
        alert.updated_at = now;

        self.store.save(&alert).await?;
        tracing::info!(alert_id = %alert_id, user = %user, "Risk alert dismissed");
        Ok(())
    }

    fn check_transition(&self, alert: &RiskAlert, to: AlertStatus) -> Result<()> {
        if alert.status.can_transition_to(to) {
            return Ok(());
        }
        match self.config.transition_policy {
            TransitionPolicy::Strict => Err(EngineError::Conflict {
                id: alert.id.clone(),
                kind: ConflictKind::Transition {
                    from: alert.status,
                    to,
                },
            }),
            TransitionPolicy::Permissive => {
                tracing::warn!(
                    alert_id = %alert.id,
                    from = %alert.status,
                    to = %to,
                    "Applying transition outside the alert state machine"
                );
                Ok(())
            }
        }
    }

    async fn load(&self, alert_id: &str) -> Result<RiskAlert> {
        self.store
            .find_by_id(alert_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                id: alert_id.to_string(),
            })
    }

    // ---- queries ----

    pub async fn get_alert(&self, alert_id: &str) -> Result<Option<RiskAlert>> {
        Ok(self.store.find_by_id(alert_id).await?)
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        page: PageRequest,
    ) -> Result<Page<RiskAlert>> {
        Ok(self.store.find_page(filter, page).await?)
    }

    /// ACTIVE alerts with CRITICAL severity.
    pub async fn active_critical_alerts(&self) -> Result<Vec<RiskAlert>> {
        Ok(self.store.find_active_critical().await?)
    }

    /// ACTIVE alerts created within the last `window_days` days.
    pub async fn active_alert_count_since(&self, window_days: u32) -> Result<u64> {
        let since = TimeDelta::try_days(i64::from(window_days))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "window_days {window_days} reaches past the supported date range"
                ))
            })?;
        Ok(self.store.count_active_since(since).await?)
    }

    pub async fn active_alert_count(&self) -> Result<u64> {
        self.active_alert_count_since(self.config.active_window_days)
            .await
    }

    /// ACTIVE alert counts for every severity, zero-filled.
    pub async fn active_severity_histogram(&self) -> Result<BTreeMap<Severity, u64>> {
        let mut histogram: BTreeMap<Severity, u64> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for (severity, count) in self.store.count_active_by_severity().await? {
            histogram.insert(severity, count);
        }
        Ok(histogram)
    }
}

fn validate_score(field: &str, score: i32) -> Result<()> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "{field} must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )))
    }
}
