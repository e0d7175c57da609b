use crate::error::{NotifyError, Result};
use crate::payload::NotificationMessage;
use crate::plugin::ChannelPlugin;
use crate::utils::truncate_string;
use crate::NotificationChannel;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const MAX_ERROR_BODY: usize = 512;

/// POSTs the message as JSON to every recipient URL.
///
/// Delivery is attempted once per URL; the dispatcher owns timeouts and the
/// engine does not retry.
pub struct WebhookChannel {
    instance_name: String,
    client: reqwest::Client,
    body_template: Option<String>,
}

impl WebhookChannel {
    pub fn new(instance_name: &str, body_template: Option<String>) -> Self {
        Self {
            instance_name: instance_name.to_string(),
            client: reqwest::Client::new(),
            body_template,
        }
    }

    pub(crate) fn render_body(&self, message: &NotificationMessage) -> Result<String> {
        match &self.body_template {
            Some(template) => Ok(template
                .replace("{{category}}", &message.category)
                .replace("{{subject}}", &message.subject)
                .replace("{{content}}", &message.content)
                .replace("{{priority}}", message.priority.as_str())),
            None => Ok(serde_json::to_string(message)?),
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, message: &NotificationMessage, recipients: &[String]) -> Result<()> {
        let body = self.render_body(message)?;

        for url in recipients {
            let resp = self
                .client
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .body(body.clone())
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                tracing::warn!(
                    channel = %self.instance_name,
                    url = %url,
                    status = %status,
                    "Webhook returned non-success status"
                );
                return Err(NotifyError::Api {
                    service: self.instance_name.clone(),
                    status: status.as_u16(),
                    body: truncate_string(&text, MAX_ERROR_BODY),
                });
            }
        }

        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.instance_name
    }
}

#[derive(Deserialize)]
struct WebhookConfig {
    body_template: Option<String>,
}

pub struct WebhookPlugin;

impl WebhookPlugin {
    fn parse(config: &Value) -> Result<WebhookConfig> {
        if config.is_null() {
            return Ok(WebhookConfig {
                body_template: None,
            });
        }
        serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("webhook: {e}")))
    }
}

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        Self::parse(config).map(|_| ())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let cfg = Self::parse(config)?;
        Ok(Box::new(WebhookChannel::new(instance_name, cfg.body_template)))
    }
}
