//! Notification fan-out for risk alerts.
//!
//! The alert engine hands persisted HIGH/CRITICAL alerts to a
//! [`NotificationDispatcher`]. The bundled [`manager::NotificationManager`]
//! turns the alert into a typed [`payload::NotificationMessage`] and routes it
//! to every [`NotificationChannel`] whose minimum severity it meets.
//! Channels are built from [`config::DispatcherConfig`] through the
//! [`plugin::ChannelRegistry`]; the built-in transports are `webhook` and
//! `log`.

pub mod channels;
pub mod config;
pub mod error;
pub mod manager;
pub mod payload;
pub mod plugin;
pub mod routing;
pub mod utils;


use async_trait::async_trait;
use riskwatch_common::types::RiskAlert;

use crate::error::Result;
use crate::payload::NotificationMessage;

/// A delivery channel that sends notification messages to an external
/// service (webhook endpoint, log sink, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers `message` to each of `recipients`.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery to any recipient fails.
    async fn send(&self, message: &NotificationMessage, recipients: &[String]) -> Result<()>;

    /// Returns the channel instance name used in logs and errors.
    fn channel_name(&self) -> &str;
}

/// Accepts a fully-formed alert and performs channel fan-out.
///
/// The engine calls this once per HIGH/CRITICAL alert it creates and does
/// not deduplicate calls, so implementations should tolerate duplicates.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, alert: &RiskAlert) -> Result<()>;
}
