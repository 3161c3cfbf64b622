//! Repository port for the shared lead table.
//!
//! Every mutating method is a single conditional write on one row: the
//! implementation checks the stated precondition and applies the new state
//! atomically, returning the updated row, or `None` when the precondition
//! did not hold at write time. Callers never read a row and then write it.

use crate::lead::domain::{
    AgentId, Lead, LeadId, QueueOrder, RevocationMode, ValidatedOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for lead repository operations.
pub type LeadRepositoryResult<T> = Result<T, LeadRepositoryError>;

/// Selection of claimable leads for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    /// Owner whose pending leads are selected.
    pub agent_id: AgentId,
    /// Leases taken before this instant count as absent.
    pub stale_cutoff: DateTime<Utc>,
    /// Result ordering.
    pub order: QueueOrder,
    /// Leads to leave out, typically those already attempted this pull.
    pub exclude: Vec<LeadId>,
    /// Maximum number of rows returned.
    pub limit: usize,
}

/// Conditional write that applies an agent's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitWrite {
    /// Lead being committed.
    pub lead_id: LeadId,
    /// Agent that must hold a fresh lease.
    pub agent_id: AgentId,
    /// Validated outcome to store.
    pub outcome: ValidatedOutcome,
    /// Write timestamp, stored as `processed_at`.
    pub now: DateTime<Utc>,
    /// Leases taken before this instant no longer entitle the agent.
    pub stale_cutoff: DateTime<Utc>,
}

/// A lead after an ownership change, with the owner it had before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    /// Lead state after the write.
    pub lead: Lead,
    /// Owner before the write.
    pub previous_assignee: Option<AgentId>,
}

/// Lease store contract.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Stores a newly distributed lead.
    ///
    /// # Errors
    ///
    /// Returns [`LeadRepositoryError::DuplicateLead`] when the identifier is
    /// already taken.
    async fn store(&self, lead: &Lead) -> LeadRepositoryResult<()>;

    /// Finds a lead by identifier.
    async fn find_by_id(&self, id: LeadId) -> LeadRepositoryResult<Option<Lead>>;

    /// Returns pending leads owned by `query.agent_id` whose lease is absent
    /// or older than `query.stale_cutoff`, in `query.order`.
    async fn claimable_for_agent(&self, query: &CandidateQuery)
    -> LeadRepositoryResult<Vec<Lead>>;

    /// Leases a pending lead to `agent_id` when its lease is absent or stale.
    async fn try_claim(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>>;

    /// Leases a pending lead to `agent_id` when the lead is still assigned
    /// to `agent_id` and its lease is absent or stale.
    ///
    /// Queue pulls use this so a lead moved to another owner between
    /// candidate selection and the claim is never leased to its old owner.
    async fn try_claim_assigned(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>>;

    /// Bumps `locked_at` when `agent_id` holds a fresh lease on the pending
    /// lead.
    async fn try_renew(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>>;

    /// Clears the lease when it is recorded as held by `agent_id`.
    async fn release_held(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>>;

    /// Clears every lease taken before `cutoff`, each row conditioned on
    /// its own staleness, and returns the leads released.
    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Vec<LeadId>>;

    /// Applies an outcome when the agent holds a fresh lease on the pending
    /// lead, clearing the lease in the same write.
    async fn try_commit(&self, write: &CommitWrite) -> LeadRepositoryResult<Option<Lead>>;

    /// Returns the identifiers of pending leads owned by `agent_id`.
    async fn pending_assigned_to(&self, agent_id: AgentId) -> LeadRepositoryResult<Vec<LeadId>>;

    /// Returns the identifiers of pending leads whose lease is recorded as
    /// held by `agent_id`, whoever owns them.
    async fn leases_held_by(&self, agent_id: AgentId) -> LeadRepositoryResult<Vec<LeadId>>;

    /// Manager override on one pending lead owned by `assignee`.
    ///
    /// [`RevocationMode::Unlock`] matches only rows holding a lease and
    /// clears it regardless of holder. [`RevocationMode::UnassignAndUnlock`]
    /// matches any such row and also clears the assignment.
    async fn force_release(
        &self,
        id: LeadId,
        assignee: AgentId,
        mode: RevocationMode,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>>;

    /// Sets the owner and clears any lease, whatever the lead's status.
    ///
    /// Returns `None` when the lead does not exist.
    async fn reassign(
        &self,
        id: LeadId,
        target: AgentId,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Reassignment>>;
}

/// Errors returned by lead repository implementations.
#[derive(Debug, Clone, Error)]
pub enum LeadRepositoryError {
    /// A lead with the same identifier already exists.
    #[error("duplicate lead identifier: {0}")]
    DuplicateLead(LeadId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LeadRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
