use riskwatch_common::types::Severity;

pub struct ChannelRoute {
    pub min_severity: Severity,
    pub channel_index: usize,
    pub recipients: Vec<String>,
}

impl ChannelRoute {
    pub fn should_send(&self, alert_severity: Severity) -> bool {
        alert_severity >= self.min_severity
    }
}
