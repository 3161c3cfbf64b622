//! Handing each agent exactly one lead from their queue.

use super::{LeaseError, LeaseManager, StaleLeaseReaper};
use crate::lead::{
    domain::{ActivityEventType, ActivityRecord, AgentId, Lead, LeadId, LeasePolicy},
    ports::{ActivityLog, CandidateQuery, LeadRepository, LeadRepositoryError},
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Result of asking the queue for the next lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The caller now holds a fresh lease on this lead.
    Leased(Lead),
    /// No claimable lead remained for the caller.
    Empty,
}

impl PullOutcome {
    /// Returns the leased lead, if any.
    #[must_use]
    pub const fn lead(&self) -> Option<&Lead> {
        match self {
            Self::Leased(lead) => Some(lead),
            Self::Empty => None,
        }
    }

    /// Consumes the outcome and returns the leased lead, if any.
    #[must_use]
    pub fn into_lead(self) -> Option<Lead> {
        match self {
            Self::Leased(lead) => Some(lead),
            Self::Empty => None,
        }
    }
}

/// Result of resuming a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The remembered lease was still held and has been renewed.
    Resumed(Lead),
    /// The remembered lease was lost, so a fresh pull was made.
    Replaced {
        /// Lead the session remembered.
        remembered: LeadId,
        /// Result of the replacement pull.
        next: PullOutcome,
    },
    /// Nothing was remembered, so a fresh pull was made.
    Fresh(PullOutcome),
}

impl ResumeOutcome {
    /// Returns the lead the caller now holds, if any.
    #[must_use]
    pub const fn lead(&self) -> Option<&Lead> {
        match self {
            Self::Resumed(lead) => Some(lead),
            Self::Replaced { next, .. } | Self::Fresh(next) => next.lead(),
        }
    }
}

/// Errors returned by queue pulls.
#[derive(Debug, Error)]
pub enum PullError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LeadRepositoryError),
}

/// Result type for queue pulls.
pub type PullResult<T> = Result<T, PullError>;

/// Serves the next lead from an agent's queue.
///
/// A pull reaps stale leases, then walks candidates in queue order, trying
/// to claim each one until a claim succeeds. Candidates lost to a concurrent
/// session, or moved to another owner since selection, are skipped for the
/// rest of the pull.
#[derive(Clone)]
pub struct QueuePuller<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    activity: Arc<L>,
    clock: Arc<C>,
    policy: LeasePolicy,
    leases: LeaseManager<R, C>,
    reaper: StaleLeaseReaper<R, C>,
}

impl<R, L, C> QueuePuller<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    /// Creates a puller.
    #[must_use]
    pub fn new(repository: Arc<R>, activity: Arc<L>, clock: Arc<C>, policy: LeasePolicy) -> Self {
        Self {
            leases: LeaseManager::new(Arc::clone(&repository), Arc::clone(&clock), policy),
            reaper: StaleLeaseReaper::new(Arc::clone(&repository), Arc::clone(&clock), policy),
            repository,
            activity,
            clock,
            policy,
        }
    }

    /// Leases the next claimable lead owned by `agent_id`.
    ///
    /// The stale-lease sweep that precedes the search is best-effort; its
    /// failure is logged and the pull continues, since claims already treat
    /// stale leases as absent.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Repository`] when candidate selection or a claim
    /// fails in the store.
    pub async fn pull_next(&self, agent_id: AgentId) -> PullResult<PullOutcome> {
        if let Err(err) = self.reaper.sweep().await {
            warn!(%agent_id, error = %err, "stale lease sweep before pull failed");
        }

        let mut attempted: Vec<LeadId> = Vec::new();
        loop {
            let query = CandidateQuery {
                agent_id,
                stale_cutoff: self.policy.stale_cutoff(self.clock.utc()),
                order: self.policy.queue_order,
                exclude: attempted.clone(),
                limit: self.policy.candidate_batch_size,
            };
            let candidates = self.repository.claimable_for_agent(&query).await?;
            if candidates.is_empty() {
                debug!(%agent_id, attempted = attempted.len(), "queue exhausted");
                return Ok(PullOutcome::Empty);
            }

            for candidate in candidates {
                let lead_id = candidate.id();
                attempted.push(lead_id);
                match self.leases.claim_assigned(lead_id, agent_id).await {
                    Ok(lead) => {
                        self.record_viewed(&lead, agent_id).await;
                        return Ok(PullOutcome::Leased(lead));
                    }
                    Err(LeaseError::Conflict(_)) => {}
                    Err(LeaseError::Repository(err)) => return Err(err.into()),
                }
            }
        }
    }

    /// Restores a session, preferring the lead it remembers.
    ///
    /// A remembered lead is renewed when the caller still holds a fresh
    /// lease on it; otherwise a normal pull is made and the result says the
    /// remembered lead was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Repository`] when the store fails.
    pub async fn resume(
        &self,
        agent_id: AgentId,
        remembered: Option<LeadId>,
    ) -> PullResult<ResumeOutcome> {
        let Some(lead_id) = remembered else {
            return Ok(ResumeOutcome::Fresh(self.pull_next(agent_id).await?));
        };

        match self.leases.renew(lead_id, agent_id).await {
            Ok(lead) => {
                info!(%lead_id, %agent_id, "session resumed on remembered lead");
                Ok(ResumeOutcome::Resumed(lead))
            }
            Err(LeaseError::Conflict(_)) => {
                info!(%lead_id, %agent_id, "remembered lead no longer held, pulling next");
                let next = self.pull_next(agent_id).await?;
                Ok(ResumeOutcome::Replaced {
                    remembered: lead_id,
                    next,
                })
            }
            Err(LeaseError::Repository(err)) => Err(err.into()),
        }
    }

    async fn record_viewed(&self, lead: &Lead, agent_id: AgentId) {
        let record = ActivityRecord::new(
            lead.id(),
            agent_id,
            ActivityEventType::Viewed,
            json!({ "locked_at": lead.locked_at() }),
            &*self.clock,
        );
        if let Err(err) = self.activity.append(&record).await {
            warn!(lead_id = %lead.id(), %agent_id, error = %err, "failed to record lead view");
        }
    }
}
