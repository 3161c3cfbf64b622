//! Manager override that strips an agent of pending work.

use crate::lead::{
    domain::{ActivityEventType, ActivityRecord, AgentId, Lead, LeadId, RevocationMode},
    ports::{ActivityLog, LeadRepository, LeadRepositoryError, LeadRepositoryResult},
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Summary of one revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationReport {
    /// Agent whose work was revoked.
    pub agent_id: AgentId,
    /// Mode applied.
    pub mode: RevocationMode,
    /// Leads changed by this call, in processing order.
    pub affected: Vec<LeadId>,
}

impl RevocationReport {
    /// Returns how many leads were changed.
    #[must_use]
    pub fn count(&self) -> usize {
        self.affected.len()
    }
}

/// Errors returned by revocation.
#[derive(Debug, Error)]
pub enum RevocationError {
    /// Listing the agent's pending leads failed; nothing was changed.
    #[error(transparent)]
    Repository(#[from] LeadRepositoryError),

    /// A per-lead write failed after earlier leads were already changed.
    /// Running the revocation again finishes the job.
    #[error("revocation stopped at lead {failed_at} after changing {} leads: {source}", .affected.len())]
    Interrupted {
        /// Leads changed before the failure.
        affected: Vec<LeadId>,
        /// Lead whose write failed.
        failed_at: LeadId,
        /// Underlying failure.
        #[source]
        source: LeadRepositoryError,
    },
}

/// Clears or unassigns every pending lead held by an agent.
///
/// Each lead is changed by its own conditional write, so a revocation racing
/// with claims and commits never clobbers a completed lead, and repeating a
/// revocation is harmless.
#[derive(Clone)]
pub struct RevocationService<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    activity: Arc<L>,
    clock: Arc<C>,
}

impl<R, L, C> RevocationService<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    /// Creates a revocation service.
    #[must_use]
    pub const fn new(repository: Arc<R>, activity: Arc<L>, clock: Arc<C>) -> Self {
        Self {
            repository,
            activity,
            clock,
        }
    }

    /// Applies `mode` to every pending lead assigned to `agent_id`, then
    /// releases any lease the agent still holds on other owners' pending
    /// leads.
    ///
    /// Other owners' leads are only unlocked, whatever the mode, and keep
    /// their assignment.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::Repository`] when the pending leads cannot
    /// be listed and [`RevocationError::Interrupted`] when a per-lead write
    /// fails part-way.
    pub async fn revoke_all(
        &self,
        agent_id: AgentId,
        mode: RevocationMode,
    ) -> Result<RevocationReport, RevocationError> {
        let assigned = self.repository.pending_assigned_to(agent_id).await?;
        let held_elsewhere: Vec<LeadId> = self
            .repository
            .leases_held_by(agent_id)
            .await?
            .into_iter()
            .filter(|lead_id| !assigned.contains(lead_id))
            .collect();
        let mut report = RevocationReport {
            agent_id,
            mode,
            affected: Vec::new(),
        };

        for lead_id in assigned {
            let written = self
                .repository
                .force_release(lead_id, agent_id, mode, self.clock.utc())
                .await;
            self.settle(&mut report, lead_id, written, revocation_event(mode))
                .await?;
        }
        for lead_id in held_elsewhere {
            let written = self
                .repository
                .release_held(lead_id, agent_id, self.clock.utc())
                .await;
            self.settle(&mut report, lead_id, written, ActivityEventType::LeaseRevoked)
                .await?;
        }

        info!(%agent_id, mode = mode.as_str(), affected = report.count(), "agent work revoked");
        Ok(report)
    }

    async fn settle(
        &self,
        report: &mut RevocationReport,
        lead_id: LeadId,
        written: LeadRepositoryResult<Option<Lead>>,
        event_type: ActivityEventType,
    ) -> Result<(), RevocationError> {
        match written {
            Ok(Some(lead)) => {
                self.record_revocation(&lead, report, event_type).await;
                report.affected.push(lead_id);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(source) => {
                warn!(
                    agent_id = %report.agent_id,
                    %lead_id,
                    mode = report.mode.as_str(),
                    error = %source,
                    "revocation interrupted"
                );
                Err(RevocationError::Interrupted {
                    affected: std::mem::take(&mut report.affected),
                    failed_at: lead_id,
                    source,
                })
            }
        }
    }

    async fn record_revocation(
        &self,
        lead: &Lead,
        report: &RevocationReport,
        event_type: ActivityEventType,
    ) {
        let record = ActivityRecord::new(
            lead.id(),
            report.agent_id,
            event_type,
            json!({ "mode": report.mode.as_str() }),
            &*self.clock,
        );
        if let Err(err) = self.activity.append(&record).await {
            warn!(lead_id = %lead.id(), agent_id = %report.agent_id, error = %err, "failed to record revocation");
        }
    }
}

const fn revocation_event(mode: RevocationMode) -> ActivityEventType {
    match mode {
        RevocationMode::Unlock => ActivityEventType::LeaseRevoked,
        RevocationMode::UnassignAndUnlock => ActivityEventType::LeadUnassigned,
    }
}
