/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use riskwatch_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "risk_alert",
///     id: "42".to_string(),
/// };
/// assert!(err.to_string().contains("risk_alert"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// The record was modified by someone else since it was read.
    #[error("Storage: {entity} {id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: i32,
        actual: i32,
    },

    /// A write succeeded but the row could not be read back.
    #[error("Storage: write of {entity} succeeded but the row could not be read back")]
    WriteReadback { entity: &'static str },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON serialization or deserialization failure (e.g. `recommended_actions`).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A column held a value that does not map to the domain type.
    #[error("Storage: unexpected value '{value}' in column '{column}'")]
    UnexpectedValue { column: &'static str, value: String },

    /// Filesystem error while preparing the data directory.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
