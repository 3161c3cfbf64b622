//! Port for the append-only lead activity trail.

use crate::lead::domain::{ActivityId, ActivityRecord, LeadId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for activity log operations.
pub type ActivityLogResult<T> = Result<T, ActivityLogError>;

/// Append-only audit sink.
///
/// Implementations never update or delete records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityLogError::DuplicateRecord`] when the record
    /// identifier was already appended.
    async fn append(&self, record: &ActivityRecord) -> ActivityLogResult<()>;

    /// Returns records for a lead in the order they were recorded.
    async fn list_for_lead(&self, lead_id: LeadId) -> ActivityLogResult<Vec<ActivityRecord>>;
}

/// Errors returned by activity log implementations.
#[derive(Debug, Clone, Error)]
pub enum ActivityLogError {
    /// A record with the same identifier already exists.
    #[error("duplicate activity record: {0}")]
    DuplicateRecord(ActivityId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ActivityLogError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
