use crate::error::Result;
use crate::payload::NotificationMessage;
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use async_trait::async_trait;
use serde_json::Value;

/// Writes notifications to the tracing output. Useful as an audit trail and
/// for local setups without an external endpoint.
pub struct LogChannel {
    instance_name: String,
}

impl LogChannel {
    pub fn new(instance_name: &str) -> Self {
        Self {
            instance_name: instance_name.to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, message: &NotificationMessage, recipients: &[String]) -> Result<()> {
        tracing::info!(
            channel = %self.instance_name,
            category = %message.category,
            priority = ?message.priority,
            recipients = recipients.len(),
            subject = %message.subject,
            "Risk alert notification"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.instance_name
    }
}

pub struct LogPlugin;

impl ChannelPlugin for LogPlugin {
    fn name(&self) -> &str {
        "log"
    }

    fn validate_config(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        _config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(LogChannel::new(instance_name)))
    }
}
