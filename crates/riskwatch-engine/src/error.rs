use riskwatch_common::types::AlertStatus;
use riskwatch_notify::error::NotifyError;
use riskwatch_storage::StorageError;

/// Why a write was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictKind {
    #[error("transition {from} -> {to} is not allowed")]
    Transition { from: AlertStatus, to: AlertStatus },

    #[error("stale version (expected {expected}, found {actual})")]
    StaleVersion { expected: i32, actual: i32 },
}

/// Errors returned by [`crate::RiskAlertEngine`].
///
/// # Examples
///
/// ```rust
/// use riskwatch_common::types::AlertStatus;
/// use riskwatch_engine::{ConflictKind, EngineError};
///
/// let err = EngineError::Conflict {
///     id: "42".into(),
///     kind: ConflictKind::Transition {
///         from: AlertStatus::Resolved,
///         to: AlertStatus::Acknowledged,
///     },
/// };
/// assert!(err.to_string().contains("RESOLVED -> ACKNOWLEDGED"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Risk alert not found: {id}")]
    NotFound { id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The alert was persisted; only notification failed.
    #[error("Alert {alert_id} was saved but notification dispatch failed: {source}")]
    Dispatch {
        alert_id: String,
        #[source]
        source: NotifyError,
    },

    #[error("Conflict on alert {id}: {kind}")]
    Conflict { id: String, kind: ConflictKind },

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionConflict {
                id,
                expected,
                actual,
                ..
            } => EngineError::Conflict {
                id,
                kind: ConflictKind::StaleVersion { expected, actual },
            },
            StorageError::NotFound { id, .. } => EngineError::NotFound { id },
            other => EngineError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
