use crate::config::{DispatcherConfig, SilenceWindowConfig};
use crate::error::{NotifyError, Result};
use crate::payload::NotificationMessage;
use crate::plugin::ChannelRegistry;
use crate::routing::ChannelRoute;
use crate::{NotificationChannel, NotificationDispatcher};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use riskwatch_common::types::RiskAlert;
use std::time::Duration;

/// Days a silence window applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    Days(Vec<Weekday>),
}

impl Recurrence {
    /// Accepts `daily` (also the default when unset), `weekdays`, `weekends`
    /// or a comma-separated day list such as `mon,wed,fri`.
    pub fn parse(value: Option<&str>) -> Result<Self> {
        let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Recurrence::Daily);
        };
        match raw.to_ascii_lowercase().as_str() {
            "daily" => Ok(Recurrence::Daily),
            "weekdays" => Ok(Recurrence::Days(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ])),
            "weekends" => Ok(Recurrence::Days(vec![Weekday::Sat, Weekday::Sun])),
            list => list
                .split(',')
                .map(|day| {
                    day.trim().parse::<Weekday>().map_err(|_| {
                        NotifyError::InvalidConfig(format!(
                            "silence window recurrence '{raw}': unknown day '{}'",
                            day.trim()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Recurrence::Days),
        }
    }

    pub fn includes(&self, day: Weekday) -> bool {
        match self {
            Recurrence::Daily => true,
            Recurrence::Days(days) => days.contains(&day),
        }
    }
}

pub struct SilenceWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub recurrence: Recurrence,
}

impl SilenceWindow {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let current_time = now.time();
        let today = now.weekday();
        if self.start <= self.end {
            self.recurrence.includes(today)
                && current_time >= self.start
                && current_time <= self.end
        } else if current_time >= self.start {
            self.recurrence.includes(today)
        } else if current_time <= self.end {
            // Overnight window (e.g., 23:00 - 03:00) opened the day before
            self.recurrence.includes(today.pred())
        } else {
            false
        }
    }

    fn from_config(cfg: &SilenceWindowConfig) -> Result<Self> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| {
                NotifyError::InvalidConfig(format!("silence window time '{s}': {e}"))
            })
        };
        Ok(Self {
            start: parse(&cfg.start_time)?,
            end: parse(&cfg.end_time)?,
            recurrence: Recurrence::parse(cfg.recurrence.as_deref())?,
        })
    }
}

/// Default [`NotificationDispatcher`]: renders the alert once and fans it out
/// to every routed channel, each bounded by the channel timeout.
pub struct NotificationManager {
    enabled: bool,
    channels: Vec<Box<dyn NotificationChannel>>,
    routes: Vec<ChannelRoute>,
    silence_windows: Vec<SilenceWindow>,
    channel_timeout: Duration,
}

impl NotificationManager {
    pub fn new(
        channels: Vec<Box<dyn NotificationChannel>>,
        routes: Vec<ChannelRoute>,
        silence_windows: Vec<SilenceWindow>,
        channel_timeout: Duration,
    ) -> Self {
        Self {
            enabled: true,
            channels,
            routes,
            silence_windows,
            channel_timeout,
        }
    }

    /// A dispatcher that accepts every alert and sends nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            channels: Vec::new(),
            routes: Vec::new(),
            silence_windows: Vec::new(),
            channel_timeout: Duration::from_secs(0),
        }
    }

    /// Builds channels through `registry`. Disabled channel entries are
    /// skipped; an unknown channel type or bad plugin config is an error.
    pub fn from_config(config: &DispatcherConfig, registry: &ChannelRegistry) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let mut channels = Vec::new();
        let mut routes = Vec::new();
        for ch in config.channels.iter().filter(|c| c.enabled) {
            let channel = registry.create_channel(&ch.channel_type, &ch.name, &ch.config)?;
            routes.push(ChannelRoute {
                min_severity: ch.min_severity,
                channel_index: channels.len(),
                recipients: ch.recipients.clone(),
            });
            channels.push(channel);
        }

        let silence_windows = config
            .silence_windows
            .iter()
            .map(SilenceWindow::from_config)
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            channels = channels.len(),
            silence_windows = silence_windows.len(),
            "Notification dispatcher configured"
        );

        Ok(Self::new(
            channels,
            routes,
            silence_windows,
            Duration::from_secs(config.channel_timeout_secs),
        ))
    }

    pub fn is_silenced(&self, now: DateTime<Utc>) -> bool {
        self.silence_windows.iter().any(|w| w.is_active(now))
    }

    pub fn channels(&self) -> &[Box<dyn NotificationChannel>] {
        &self.channels
    }

    /// Same as [`NotificationDispatcher::dispatch`] with an explicit clock.
    pub async fn dispatch_at(&self, alert: &RiskAlert, now: DateTime<Utc>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.is_silenced(now) {
            tracing::info!(
                alert_id = %alert.id,
                "Notification suppressed (silence window active)"
            );
            return Ok(());
        }

        let message = NotificationMessage::from_alert(alert);
        message.payload.validate()?;

        let mut failed = Vec::new();
        for route in &self.routes {
            if !route.should_send(alert.severity) {
                continue;
            }
            let Some(channel) = self.channels.get(route.channel_index) else {
                continue;
            };

            if let Err(e) = self.send_bounded(channel.as_ref(), &message, &route.recipients).await {
                tracing::error!(
                    alert_id = %alert.id,
                    channel = channel.channel_name(),
                    error = %e,
                    "Failed to send notification"
                );
                failed.push(channel.channel_name().to_string());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Delivery { failed })
        }
    }

    async fn send_bounded(
        &self,
        channel: &dyn NotificationChannel,
        message: &NotificationMessage,
        recipients: &[String],
    ) -> Result<()> {
        match tokio::time::timeout(self.channel_timeout, channel.send(message, recipients)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout {
                channel: channel.channel_name().to_string(),
                timeout_ms: self.channel_timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for NotificationManager {
    async fn dispatch(&self, alert: &RiskAlert) -> Result<()> {
        self.dispatch_at(alert, Utc::now()).await
    }
}
