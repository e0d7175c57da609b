use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use riskwatch_common::types::Severity;
///
/// let sev: Severity = "high".parse().unwrap();
/// assert_eq!(sev, Severity::High);
/// assert_eq!(sev.to_string(), "HIGH");
/// assert!(Severity::Critical > Severity::Medium);
/// assert!(sev.requires_notification());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// HIGH and CRITICAL alerts are handed to the notification dispatcher.
    pub fn requires_notification(self) -> bool {
        self >= Severity::High
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle stage of a risk alert.
///
/// RESOLVED and DISMISSED are terminal.
///
/// ```
/// use riskwatch_common::types::AlertStatus;
///
/// assert!(AlertStatus::Active.can_transition_to(AlertStatus::Acknowledged));
/// assert!(AlertStatus::Acknowledged.can_transition_to(AlertStatus::Resolved));
/// assert!(!AlertStatus::Acknowledged.can_transition_to(AlertStatus::Acknowledged));
/// assert!(!AlertStatus::Dismissed.can_transition_to(AlertStatus::Resolved));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 4] = [
        AlertStatus::Active,
        AlertStatus::Acknowledged,
        AlertStatus::Resolved,
        AlertStatus::Dismissed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }

    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        match (self, next) {
            (AlertStatus::Active, AlertStatus::Acknowledged)
            | (AlertStatus::Active, AlertStatus::Resolved)
            | (AlertStatus::Active, AlertStatus::Dismissed)
            | (AlertStatus::Acknowledged, AlertStatus::Resolved)
            | (AlertStatus::Acknowledged, AlertStatus::Dismissed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
            AlertStatus::Dismissed => "DISMISSED",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(AlertStatus::Active),
            "ACKNOWLEDGED" => Ok(AlertStatus::Acknowledged),
            "RESOLVED" => Ok(AlertStatus::Resolved),
            "DISMISSED" => Ok(AlertStatus::Dismissed),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// Kind of domain object that raised an alert.
///
/// Unknown kinds are kept verbatim in [`SourceType::Other`] so upstream
/// monitors can introduce new sources without a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SourceType {
    Supplier,
    Shipment,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Supplier => "SUPPLIER",
            SourceType::Shipment => "SHIPMENT",
            SourceType::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SourceType {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "SUPPLIER" => SourceType::Supplier,
            "SHIPMENT" => SourceType::Shipment,
            _ => SourceType::Other(s),
        }
    }
}

impl From<&str> for SourceType {
    fn from(s: &str) -> Self {
        SourceType::from(s.to_string())
    }
}

impl From<SourceType> for String {
    fn from(source: SourceType) -> Self {
        match source {
            SourceType::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

/// Weak reference to a user, by id only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(pub String);

impl UserRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserRef {
    fn from(id: &str) -> Self {
        UserRef(id.to_string())
    }
}

/// A verified caller identity, as produced by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject id of the user.
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn user_ref(&self) -> UserRef {
        UserRef(self.subject.clone())
    }
}

/// A persisted record representing a detected supply-chain risk condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: String,
    /// Free-form category, e.g. `SUPPLIER_HIGH_RISK`.
    pub alert_type: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub title: String,
    pub description: String,
    pub source_type: Option<SourceType>,
    pub source_id: Option<String>,
    /// Score snapshot, supplier-sourced alerts only.
    pub risk_score: Option<i32>,
    pub impact_assessment: Option<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    pub acknowledged_by: Option<UserRef>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserRef>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub dismissed_by: Option<UserRef>,
    pub dismissed_at: Option<DateTime<Utc>>,
    /// Number of successful saves; 0 until first persisted.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RiskAlert {
    /// Builds an unsaved ACTIVE alert with a fresh id and no transition fields.
    pub fn new(
        alert_type: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: crate::id::next_id(),
            alert_type: alert_type.into(),
            severity,
            status: AlertStatus::Active,
            title: title.into(),
            description: description.into(),
            source_type: None,
            source_id: None,
            risk_score: None,
            impact_assessment: None,
            recommended_actions: Vec::new(),
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            dismissed_by: None,
            dismissed_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    pub fn is_supplier_alert(&self) -> bool {
        self.source_type == Some(SourceType::Supplier)
    }
}
