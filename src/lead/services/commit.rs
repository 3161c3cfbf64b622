//! Applying an agent's outcome to the lead they hold.

use crate::lead::{
    domain::{
        ActivityEventType, ActivityRecord, AgentId, CommitOutcome, CommitValidationError, Lead,
        LeadId, LeasePolicy,
    },
    ports::{ActivityLog, ActivityLogError, CommitWrite, LeadRepository, LeadRepositoryError},
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors returned when committing an outcome.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The outcome failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] CommitValidationError),

    /// The caller no longer holds a fresh lease on the pending lead.
    #[error("lead {0} is not leased to the committing agent")]
    Conflict(LeadId),

    /// The lead does not exist.
    #[error("lead not found: {0}")]
    NotFound(LeadId),

    /// The outcome was stored but its activity record was not.
    #[error("outcome for lead {lead_id} was committed but the activity record failed: {source}")]
    AuditTrail {
        /// Lead whose outcome was stored.
        lead_id: LeadId,
        /// Activity log failure.
        #[source]
        source: ActivityLogError,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LeadRepositoryError),
}

/// Result type for commits.
pub type CommitResult<T> = Result<T, CommitError>;

/// Validates and applies agent outcomes under the lease guard.
#[derive(Clone)]
pub struct CommitProcessor<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    activity: Arc<L>,
    clock: Arc<C>,
    policy: LeasePolicy,
}

impl<R, L, C> CommitProcessor<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    /// Creates a commit processor.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        activity: Arc<L>,
        clock: Arc<C>,
        policy: LeasePolicy,
    ) -> Self {
        Self {
            repository,
            activity,
            clock,
            policy,
        }
    }

    /// Stores `outcome` on `lead_id` and releases the lease in one write,
    /// then appends the matching activity record.
    ///
    /// The write only lands while `agent_id` holds a fresh lease on the
    /// pending lead; a lease reclaimed by another session makes this a
    /// conflict and leaves the row untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::Validation`] before touching the store,
    /// [`CommitError::Conflict`] or [`CommitError::NotFound`] when the
    /// guarded write does not match, [`CommitError::AuditTrail`] when the
    /// outcome is stored but the activity record is not, and
    /// [`CommitError::Repository`] when the store fails.
    pub async fn commit(
        &self,
        lead_id: LeadId,
        agent_id: AgentId,
        outcome: CommitOutcome,
    ) -> CommitResult<Lead> {
        let validated = outcome
            .validate(self.policy.min_note_chars)
            .inspect_err(|err| debug!(%lead_id, %agent_id, error = %err, "commit rejected"))?;

        let now = self.clock.utc();
        let write = CommitWrite {
            lead_id,
            agent_id,
            outcome: validated.clone(),
            now,
            stale_cutoff: self.policy.stale_cutoff(now),
        };
        let Some(lead) = self.repository.try_commit(&write).await? else {
            return Err(self.classify_miss(lead_id, agent_id).await?);
        };
        info!(%lead_id, %agent_id, status = %lead.status(), "outcome committed");

        let record = ActivityRecord::new(
            lead_id,
            agent_id,
            ActivityEventType::from(validated.action()),
            json!({
                "notes": validated.notes(),
                "potential_level": validated.potential_level(),
                "recording_ref": validated.recording_ref(),
            }),
            &*self.clock,
        );
        if let Err(source) = self.activity.append(&record).await {
            error!(%lead_id, %agent_id, error = %source, "committed outcome has no activity record");
            return Err(CommitError::AuditTrail { lead_id, source });
        }
        Ok(lead)
    }

    async fn classify_miss(
        &self,
        lead_id: LeadId,
        agent_id: AgentId,
    ) -> Result<CommitError, LeadRepositoryError> {
        if self.repository.find_by_id(lead_id).await?.is_some() {
            debug!(%lead_id, %agent_id, "commit conflicted");
            Ok(CommitError::Conflict(lead_id))
        } else {
            debug!(%lead_id, %agent_id, "commit targeted a missing lead");
            Ok(CommitError::NotFound(lead_id))
        }
    }
}
