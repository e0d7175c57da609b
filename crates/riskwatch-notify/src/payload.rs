use chrono::{DateTime, Utc};
use riskwatch_common::types::{RiskAlert, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{NotifyError, Result};

const MAX_KEY_LEN: usize = 64;
const MAX_TEXT_LEN: usize = 4096;
const MAX_LIST_LEN: usize = 64;

/// Delivery urgency derived from alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

impl From<Severity> for Priority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Priority::Low,
            Severity::Medium => Priority::Medium,
            Severity::High => Priority::High,
            Severity::Critical => Priority::Urgent,
        }
    }
}

/// The closed set of values a notification payload may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PayloadValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    /// Flat list; nested lists are rejected by [`NotificationPayload::validate`].
    List(Vec<PayloadValue>),
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Text(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::Text(s)
    }
}

impl From<i64> for PayloadValue {
    fn from(n: i64) -> Self {
        PayloadValue::Integer(n)
    }
}

impl From<DateTime<Utc>> for PayloadValue {
    fn from(t: DateTime<Utc>) -> Self {
        PayloadValue::Timestamp(t)
    }
}

/// Structured data attached to a notification, keyed by snake_case names.
///
/// # Examples
///
/// ```
/// use riskwatch_notify::payload::{NotificationPayload, PayloadValue};
///
/// let mut payload = NotificationPayload::default();
/// payload.insert("risk_score", 82_i64);
/// payload.insert("alert_type", "SUPPLIER_HIGH_RISK");
/// assert!(payload.validate().is_ok());
///
/// payload.insert("Bad Key", "x");
/// assert!(payload.validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPayload(BTreeMap<String, PayloadValue>);

impl NotificationPayload {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks key syntax and value bounds.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.0 {
            validate_key(key)?;
            validate_value(key, value, false)?;
        }
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let well_formed = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(NotifyError::InvalidPayload(format!("invalid key '{key}'")))
    }
}

fn validate_value(key: &str, value: &PayloadValue, nested: bool) -> Result<()> {
    match value {
        PayloadValue::Text(text) if text.len() > MAX_TEXT_LEN => Err(NotifyError::InvalidPayload(
            format!("value of '{key}' exceeds {MAX_TEXT_LEN} bytes"),
        )),
        PayloadValue::List(_) if nested => Err(NotifyError::InvalidPayload(format!(
            "'{key}' contains a nested list"
        ))),
        PayloadValue::List(items) if items.len() > MAX_LIST_LEN => Err(
            NotifyError::InvalidPayload(format!("'{key}' has more than {MAX_LIST_LEN} items")),
        ),
        PayloadValue::List(items) => items
            .iter()
            .try_for_each(|item| validate_value(key, item, true)),
        _ => Ok(()),
    }
}

/// A rendered notification ready for channel delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub category: String,
    pub subject: String,
    pub content: String,
    pub priority: Priority,
    pub payload: NotificationPayload,
}

impl NotificationMessage {
    pub const RISK_ALERT_CATEGORY: &'static str = "RISK_ALERT";

    pub fn from_alert(alert: &RiskAlert) -> Self {
        let subject = format!("{} Risk Alert: {}", alert.severity, alert.title);
        let content = format!(
            "A {} severity risk alert has been detected:\n\n{}\n\nPlease review immediately.",
            alert.severity.as_str().to_lowercase(),
            alert.description,
        );

        let mut payload = NotificationPayload::default();
        payload.insert("alert_id", alert.id.as_str());
        payload.insert("alert_type", alert.alert_type.as_str());
        payload.insert("severity", alert.severity.as_str());
        payload.insert("status", alert.status.as_str());
        payload.insert("created_at", alert.created_at);
        if let Some(source_type) = &alert.source_type {
            payload.insert("source_type", source_type.as_str());
        }
        if let Some(source_id) = &alert.source_id {
            payload.insert("source_id", source_id.as_str());
        }
        if let Some(score) = alert.risk_score {
            payload.insert("risk_score", i64::from(score));
        }
        if !alert.recommended_actions.is_empty() {
            payload.insert(
                "recommended_actions",
                PayloadValue::List(
                    alert
                        .recommended_actions
                        .iter()
                        .map(|a| PayloadValue::Text(a.clone()))
                        .collect(),
                ),
            );
        }

        Self {
            category: Self::RISK_ALERT_CATEGORY.to_string(),
            subject,
            content,
            priority: Priority::from(alert.severity),
            payload,
        }
    }
}
