/// Errors that can occur within the notification subsystem.
///
/// # Examples
///
/// ```rust
/// use riskwatch_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing url".to_string());
/// assert!(err.to_string().contains("missing url"));
///
/// let err = NotifyError::Delivery { failed: vec!["ops-webhook".into(), "audit-log".into()] };
/// assert!(err.to_string().contains("ops-webhook, audit-log"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// The channel type is not registered in the plugin registry.
    #[error("Notify: unknown channel type '{0}'")]
    UnknownChannelType(String),

    /// The message payload failed validation at the dispatcher boundary.
    #[error("Notify: invalid payload: {0}")]
    InvalidPayload(String),

    /// An HTTP request to an external notification endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("Notify: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The external endpoint returned a non-success response.
    #[error("Notify: API error from {service}: status={status}, body={body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    /// A channel did not finish within the configured timeout.
    #[error("Notify: channel '{channel}' timed out after {timeout_ms}ms")]
    Timeout { channel: String, timeout_ms: u64 },

    /// One or more routed channels failed; the others were still attempted.
    #[error("Notify: delivery failed on {}", .failed.join(", "))]
    Delivery { failed: Vec<String> },
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
