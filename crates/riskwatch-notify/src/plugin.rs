use crate::error::{NotifyError, Result};
use crate::NotificationChannel;
use serde_json::Value;
use std::collections::HashMap;

/// Factory for [`NotificationChannel`] instances built from a JSON config
/// blob (the `config` field of a `[[notification.channels]]` entry).
pub trait ChannelPlugin: Send + Sync {
    /// Plugin type name matched against `channel_type`.
    fn name(&self) -> &str;

    fn validate_config(&self, config: &Value) -> Result<()>;

    /// `instance_name` is the configured channel name, used in logs and in
    /// [`NotifyError::Delivery`].
    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>>;
}

/// Registry of available [`ChannelPlugin`]s.
///
/// # Examples
///
/// ```
/// use riskwatch_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// assert!(registry.has_plugin("webhook"));
/// assert!(registry.has_plugin("log"));
/// assert!(!registry.has_plugin("pager"));
/// ```
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn create_channel(
        &self,
        type_name: &str,
        instance_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let plugin = self
            .plugins
            .get(type_name)
            .ok_or_else(|| NotifyError::UnknownChannelType(type_name.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_channel(instance_name, config)
    }

    pub fn has_plugin(&self, type_name: &str) -> bool {
        self.plugins.contains_key(type_name)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::webhook::WebhookPlugin));
        registry.register(Box::new(crate::channels::log::LogPlugin));
        registry
    }
}
