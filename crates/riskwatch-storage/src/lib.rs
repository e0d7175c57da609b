//! Persistence layer for risk alerts.
//!
//! [`AlertStore`] is the boundary the alert engine talks to. The default
//! implementation ([`store::AlertDb`]) is backed by SeaORM and runs the
//! `migration` crate on startup; SQLite is used unless another database URL
//! is configured.

pub mod entities;
pub mod error;
pub mod store;


use async_trait::async_trait;
use chrono::{DateTime, Utc};
use riskwatch_common::types::{AlertStatus, RiskAlert, Severity, SourceType};
use serde::{Deserialize, Serialize};

pub use error::{Result, StorageError};
pub use store::AlertDb;

/// Selects which alerts a paged query returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AlertFilter {
    #[default]
    All,
    Status(AlertStatus),
    Severity(Severity),
    AlertType(String),
    /// Alerts raised by one source kind, optionally narrowed to one object.
    Source {
        source_type: SourceType,
        source_id: Option<String>,
    },
}

/// Offset pagination request.
///
/// # Examples
///
/// ```
/// use riskwatch_storage::PageRequest;
///
/// let page = PageRequest::new(5000, 40);
/// assert_eq!(page.limit, PageRequest::MAX_LIMIT);
/// assert_eq!(page.offset, 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 1000;

    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Persistence backend for risk alerts.
///
/// Implementations must be `Send + Sync`: the engine is shared across
/// request handlers. Listings are ordered by `created_at` descending with
/// `id` descending as tie-breaker, so offset pagination is stable.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Inserts an unsaved alert (`version == 0`) or updates a persisted one.
    ///
    /// Updates only apply when the stored version equals `alert.version`;
    /// otherwise [`StorageError::VersionConflict`] is returned. The returned
    /// alert carries the incremented version.
    async fn save(&self, alert: &RiskAlert) -> Result<RiskAlert>;

    async fn find_by_id(&self, id: &str) -> Result<Option<RiskAlert>>;

    async fn find_page(&self, filter: &AlertFilter, page: PageRequest) -> Result<Page<RiskAlert>>;

    /// All ACTIVE alerts with CRITICAL severity.
    async fn find_active_critical(&self) -> Result<Vec<RiskAlert>>;

    /// Number of ACTIVE alerts created at or after `since`.
    async fn count_active_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// ACTIVE alert counts per severity. Severities without alerts are omitted.
    async fn count_active_by_severity(&self) -> Result<Vec<(Severity, u64)>>;

    /// Most recent ACTIVE alert of `alert_type` raised by the given source.
    async fn find_active_by_source(
        &self,
        alert_type: &str,
        source_type: &SourceType,
        source_id: &str,
    ) -> Result<Option<RiskAlert>>;
}
