use serde::{Deserialize, Serialize};

/// How transitions outside the alert state machine are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Reject with [`crate::EngineError::Conflict`]; nothing is written.
    #[default]
    Strict,
    /// Apply any transition, logging a warning.
    Permissive,
}

/// Score thresholds for the built-in supplier rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// A score strictly above this is high risk.
    #[serde(default = "default_high_risk")]
    pub high_risk: i32,
    /// Sharp increases only count above this score.
    #[serde(default = "default_increase_floor")]
    pub increase_floor: i32,
    /// Minimum jump over the previous score to count as sharp.
    #[serde(default = "default_increase_delta")]
    pub increase_delta: i32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_risk: default_high_risk(),
            increase_floor: default_increase_floor(),
            increase_delta: default_increase_delta(),
        }
    }
}

/// Engine behaviour knobs, the `[engine]` table of the server config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
    /// Skip a supplier finding when an ACTIVE alert of the same type already
    /// exists for that supplier.
    #[serde(default)]
    pub dedup_active: bool,
    /// Window used by `active_alert_count`.
    #[serde(default = "default_active_window_days")]
    pub active_window_days: u32,
    #[serde(default)]
    pub thresholds: RiskThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            dedup_active: false,
            active_window_days: default_active_window_days(),
            thresholds: RiskThresholds::default(),
        }
    }
}

fn default_high_risk() -> i32 {
    75
}

fn default_increase_floor() -> i32 {
    50
}

fn default_increase_delta() -> i32 {
    15
}

fn default_active_window_days() -> u32 {
    30
}
