use riskwatch_common::types::Severity;
use serde::{Deserialize, Serialize};

/// Explicit dispatcher configuration, normally the `[notification]` table of
/// the server config. Nothing in this crate reads process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound for a single channel's `send`.
    #[serde(default = "default_channel_timeout_secs")]
    pub channel_timeout_secs: u64,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub silence_windows: Vec<SilenceWindowConfig>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            channel_timeout_secs: default_channel_timeout_secs(),
            channels: Vec::new(),
            silence_windows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Plugin name, e.g. `"webhook"` or `"log"`.
    pub channel_type: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Plugin-specific settings (credentials, headers, ...).
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Quiet period, `HH:MM` in UTC. `start > end` wraps past midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceWindowConfig {
    pub start_time: String,
    pub end_time: String,
    /// `daily` (default), `weekdays`, `weekends` or days like `mon,wed,fri`.
    /// An overnight window belongs to the day it starts on.
    #[serde(default)]
    pub recurrence: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_channel_timeout_secs() -> u64 {
    10
}

fn default_min_severity() -> Severity {
    Severity::High
}
