//! Claim, renew, and release primitives for a single lead.

use crate::lead::{
    domain::{AgentId, Lead, LeadId, LeasePolicy},
    ports::{LeadRepository, LeadRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned by lease operations.
#[derive(Debug, Error)]
pub enum LeaseError {
    /// The lease precondition did not hold when the row was written. The
    /// caller should move on to another lead rather than retry this one.
    #[error("lease on lead {0} is held by another session or no longer leasable")]
    Conflict(LeadId),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LeadRepositoryError),
}

impl LeaseError {
    /// Returns `true` for contention, which is expected and recoverable.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type for lease operations.
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Atomic lease primitives over the lease store.
#[derive(Clone)]
pub struct LeaseManager<R, C>
where
    R: LeadRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    policy: LeasePolicy,
}

impl<R, C> LeaseManager<R, C>
where
    R: LeadRepository,
    C: Clock + Send + Sync,
{
    /// Creates a lease manager.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>, policy: LeasePolicy) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// Returns the policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &LeasePolicy {
        &self.policy
    }

    /// Leases a pending lead to `agent_id` when its current lease is absent
    /// or stale, and returns the leased lead.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Conflict`] when another session holds a fresh
    /// lease, the lead is not pending, or it does not exist, and
    /// [`LeaseError::Repository`] when the store fails.
    pub async fn claim(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<Lead> {
        let now = self.clock.utc();
        let stale_cutoff = self.policy.stale_cutoff(now);
        let claimed = self
            .repository
            .try_claim(lead_id, agent_id, now, stale_cutoff)
            .await?;
        Self::settle_claim(lead_id, agent_id, claimed)
    }

    /// Like [`Self::claim`], but only succeeds while the lead is still
    /// assigned to `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Conflict`] when the lead has moved to another
    /// owner or when [`Self::claim`] would conflict, and
    /// [`LeaseError::Repository`] when the store fails.
    pub async fn claim_assigned(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<Lead> {
        let now = self.clock.utc();
        let stale_cutoff = self.policy.stale_cutoff(now);
        let claimed = self
            .repository
            .try_claim_assigned(lead_id, agent_id, now, stale_cutoff)
            .await?;
        Self::settle_claim(lead_id, agent_id, claimed)
    }

    fn settle_claim(lead_id: LeadId, agent_id: AgentId, claimed: Option<Lead>) -> LeaseResult<Lead> {
        let Some(lead) = claimed else {
            debug!(%lead_id, %agent_id, "lease claim conflicted");
            return Err(LeaseError::Conflict(lead_id));
        };
        info!(%lead_id, %agent_id, "lease claimed");
        Ok(lead)
    }

    /// Extends a fresh lease already held by `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Conflict`] when the caller does not hold a
    /// fresh lease on a pending lead (including when its own lease has gone
    /// stale), and [`LeaseError::Repository`] when the store fails.
    pub async fn renew(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<Lead> {
        let now = self.clock.utc();
        let stale_cutoff = self.policy.stale_cutoff(now);
        let renewed = self
            .repository
            .try_renew(lead_id, agent_id, now, stale_cutoff)
            .await?;
        let Some(lead) = renewed else {
            debug!(%lead_id, %agent_id, "lease renewal conflicted");
            return Err(LeaseError::Conflict(lead_id));
        };
        debug!(%lead_id, %agent_id, "lease renewed");
        Ok(lead)
    }

    /// Gives up a lease held by `agent_id`.
    ///
    /// Releasing a lead the caller does not hold, or releasing twice, changes
    /// nothing. Returns `true` when this call cleared a lease.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Repository`] when the store fails.
    pub async fn release(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<bool> {
        let now = self.clock.utc();
        let released = self
            .repository
            .release_held(lead_id, agent_id, now)
            .await?
            .is_some();
        if released {
            info!(%lead_id, %agent_id, "lease released");
        } else {
            debug!(%lead_id, %agent_id, "release ignored, lease not held by caller");
        }
        Ok(released)
    }
}
