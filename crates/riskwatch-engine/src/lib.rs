//! Risk alert lifecycle engine.
//!
//! [`RiskAlertEngine`] creates alerts (directly or from supplier score
//! changes), persists them through an [`riskwatch_storage::AlertStore`],
//! hands HIGH/CRITICAL alerts to a [`riskwatch_notify::NotificationDispatcher`]
//! and applies operator transitions (acknowledge, resolve, dismiss).
//! Supplier score changes are evaluated by an ordered list of
//! [`SupplierRiskRule`]s; the first rule that matches wins.

pub mod config;
pub mod engine;
pub mod error;
pub mod rules;

#[cfg(test)]
mod tests;

use riskwatch_common::types::Severity;

pub use config::{EngineConfig, RiskThresholds, TransitionPolicy};
pub use engine::{NewAlert, RiskAlertEngine};
pub use error::{ConflictKind, EngineError, Result};

/// What a matching rule wants raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskFinding {
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

/// A rule that looks at a supplier's current and previous risk score and
/// optionally produces a [`RiskFinding`].
///
/// Rules are held by the engine in evaluation order. Scores have already
/// been validated to lie in `0..=100`.
pub trait SupplierRiskRule: Send + Sync {
    /// Stable identifier used in logs (e.g. `"threshold-crossing"`).
    fn id(&self) -> &str;

    fn evaluate(&self, current: i32, previous: Option<i32>) -> Option<RiskFinding>;
}
