//! Moving leads between agents.

use crate::lead::{
    domain::{ActivityEventType, ActivityRecord, AgentId, Lead, LeadId},
    ports::{ActivityLog, LeadRepository, LeadRepositoryError, Reassignment},
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single lead was not transferred.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// The lead does not exist.
    #[error("lead not found: {0}")]
    NotFound(LeadId),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LeadRepositoryError),
}

/// Per-lead result of a transfer.
#[derive(Debug, Clone)]
pub struct TransferResult {
    /// Lead the result concerns.
    pub lead_id: LeadId,
    /// The lead after reassignment, or why it was left alone.
    pub outcome: Result<Lead, TransferError>,
}

impl TransferResult {
    /// Returns `true` when the lead now belongs to the target agent.
    #[must_use]
    pub const fn is_transferred(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Reassigns leads to a target agent, one conditional write per lead.
///
/// Any lease on a transferred lead is cleared, so a session that was working
/// it loses its claim and its next commit conflicts.
#[derive(Clone)]
pub struct TransferService<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    activity: Arc<L>,
    clock: Arc<C>,
}

impl<R, L, C> TransferService<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    /// Creates a transfer service.
    #[must_use]
    pub const fn new(repository: Arc<R>, activity: Arc<L>, clock: Arc<C>) -> Self {
        Self {
            repository,
            activity,
            clock,
        }
    }

    /// Reassigns every lead in `lead_ids` to `target`.
    ///
    /// Each id is handled independently; a missing lead or failed write is
    /// reported in its own result and does not stop the rest.
    pub async fn transfer(&self, lead_ids: &[LeadId], target: AgentId) -> Vec<TransferResult> {
        let mut results = Vec::with_capacity(lead_ids.len());
        for &lead_id in lead_ids {
            let outcome = self.transfer_one(lead_id, target).await;
            results.push(TransferResult { lead_id, outcome });
        }
        let transferred = results.iter().filter(|r| r.is_transferred()).count();
        info!(%target, requested = lead_ids.len(), transferred, "leads transferred");
        results
    }

    async fn transfer_one(&self, lead_id: LeadId, target: AgentId) -> Result<Lead, TransferError> {
        let now = self.clock.utc();
        let reassignment = self
            .repository
            .reassign(lead_id, target, now)
            .await
            .inspect_err(|err| warn!(%lead_id, %target, error = %err, "transfer failed"))?;
        let Some(Reassignment {
            lead,
            previous_assignee,
        }) = reassignment
        else {
            debug!(%lead_id, %target, "transfer skipped missing lead");
            return Err(TransferError::NotFound(lead_id));
        };

        let record = ActivityRecord::new(
            lead_id,
            target,
            ActivityEventType::LeadTransferred,
            json!({ "from": previous_assignee, "to": target }),
            &*self.clock,
        );
        if let Err(err) = self.activity.append(&record).await {
            warn!(%lead_id, %target, error = %err, "failed to record transfer");
        }
        Ok(lead)
    }
}
