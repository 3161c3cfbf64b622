//! In-memory activity log.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::lead::{
    domain::{ActivityRecord, LeadId},
    ports::{ActivityLog, ActivityLogError, ActivityLogResult},
};

/// Thread-safe append-only activity log held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityLog {
    records: Arc<RwLock<Vec<ActivityRecord>>>,
}

impl InMemoryActivityLog {
    /// Creates an empty activity log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every record in append order.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityLogError::Persistence`] when the lock is poisoned.
    pub fn all(&self) -> ActivityLogResult<Vec<ActivityRecord>> {
        let records = self.records.read().map_err(|err| {
            ActivityLogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(records.clone())
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn append(&self, record: &ActivityRecord) -> ActivityLogResult<()> {
        let mut records = self.records.write().map_err(|err| {
            ActivityLogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(ActivityLogError::DuplicateRecord(record.id()));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn list_for_lead(&self, lead_id: LeadId) -> ActivityLogResult<Vec<ActivityRecord>> {
        let records = self.records.read().map_err(|err| {
            ActivityLogError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(records
            .iter()
            .filter(|record| record.lead_id() == lead_id)
            .cloned()
            .collect())
    }
}
