//! Lead aggregate root and lease value type.

use super::{
    AgentId, BatchId, LeadDomainError, LeadId, LeadPriority, LeadStatus, PotentialLevel,
    ValidatedOutcome,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Exclusive, time-bounded possession of a pending lead by one agent.
///
/// A lease carries no expiry of its own: freshness is always judged against
/// a caller-supplied cutoff (`now - lease_ttl`), so every claimant applies
/// the same policy at the moment it looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    agent_id: AgentId,
    locked_at: DateTime<Utc>,
}

impl Lease {
    /// Creates a lease held by `agent_id` since `locked_at`.
    #[must_use]
    pub const fn new(agent_id: AgentId, locked_at: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            locked_at,
        }
    }

    /// Returns the agent holding the lease.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Returns when the lease was acquired or last renewed.
    #[must_use]
    pub const fn locked_at(&self) -> DateTime<Utc> {
        self.locked_at
    }

    /// Returns the instant after which the lease is stale under `ttl`.
    #[must_use]
    pub fn expires_at(&self, ttl: TimeDelta) -> DateTime<Utc> {
        self.locked_at + ttl
    }

    /// Returns `true` when the lease was taken before `cutoff`.
    #[must_use]
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.locked_at < cutoff
    }

    /// Returns `true` when `agent_id` holds this lease and it is not stale.
    #[must_use]
    pub fn is_fresh_for(&self, agent_id: AgentId, cutoff: DateTime<Utc>) -> bool {
        self.agent_id == agent_id && !self.is_stale(cutoff)
    }
}

/// Lead aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    id: LeadId,
    status: LeadStatus,
    assigned_to: Option<AgentId>,
    lease: Option<Lease>,
    batch_id: Option<BatchId>,
    priority: LeadPriority,
    notes: Option<String>,
    potential_level: Option<PotentialLevel>,
    recording_ref: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLeadData {
    /// Persisted lead identifier.
    pub id: LeadId,
    /// Persisted lifecycle status.
    pub status: LeadStatus,
    /// Owning agent, if assigned.
    pub assigned_to: Option<AgentId>,
    /// Agent currently holding the lease.
    pub current_agent_id: Option<AgentId>,
    /// When the current lease was acquired.
    pub locked_at: Option<DateTime<Utc>>,
    /// Originating upload batch.
    pub batch_id: Option<BatchId>,
    /// Queue priority.
    pub priority: LeadPriority,
    /// Annotation stored by the last commit.
    pub notes: Option<String>,
    /// Potential classification stored by the last commit.
    pub potential_level: Option<PotentialLevel>,
    /// Call recording reference stored by the last commit.
    pub recording_ref: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the lead left the pending pool.
    pub processed_at: Option<DateTime<Utc>>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Creates a pending, unleased lead owned by `assigned_to`.
    #[must_use]
    pub fn new(assigned_to: Option<AgentId>, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: LeadId::new(),
            status: LeadStatus::Pending,
            assigned_to,
            lease: None,
            batch_id: None,
            priority: LeadPriority::default(),
            notes: None,
            potential_level: None,
            recording_ref: None,
            created_at: timestamp,
            processed_at: None,
            updated_at: timestamp,
        }
    }

    /// Sets the originating upload batch.
    #[must_use]
    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Sets the queue priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: LeadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Reconstructs a lead from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`LeadDomainError::InconsistentLease`] when only one of the
    /// lease columns is set, or when a lease is present on a lead that is no
    /// longer pending.
    pub fn from_persisted(data: PersistedLeadData) -> Result<Self, LeadDomainError> {
        let lease = match (data.current_agent_id, data.locked_at) {
            (Some(agent_id), Some(locked_at)) => Some(Lease::new(agent_id, locked_at)),
            (None, None) => None,
            _ => return Err(LeadDomainError::InconsistentLease(data.id)),
        };
        if lease.is_some() && !data.status.is_leasable() {
            return Err(LeadDomainError::InconsistentLease(data.id));
        }

        Ok(Self {
            id: data.id,
            status: data.status,
            assigned_to: data.assigned_to,
            lease,
            batch_id: data.batch_id,
            priority: data.priority,
            notes: data.notes,
            potential_level: data.potential_level,
            recording_ref: data.recording_ref,
            created_at: data.created_at,
            processed_at: data.processed_at,
            updated_at: data.updated_at,
        })
    }

    /// Returns the lead identifier.
    #[must_use]
    pub const fn id(&self) -> LeadId {
        self.id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> LeadStatus {
        self.status
    }

    /// Returns the owning agent, if any.
    #[must_use]
    pub const fn assigned_to(&self) -> Option<AgentId> {
        self.assigned_to
    }

    /// Returns the active lease, if any. The lease may be stale.
    #[must_use]
    pub const fn lease(&self) -> Option<&Lease> {
        self.lease.as_ref()
    }

    /// Returns the agent recorded as holding the lease, if any.
    #[must_use]
    pub fn current_agent_id(&self) -> Option<AgentId> {
        self.lease.map(|lease| lease.agent_id())
    }

    /// Returns when the recorded lease was acquired, if any.
    #[must_use]
    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        self.lease.map(|lease| lease.locked_at())
    }

    /// Returns the originating upload batch.
    #[must_use]
    pub const fn batch_id(&self) -> Option<&BatchId> {
        self.batch_id.as_ref()
    }

    /// Returns the queue priority.
    #[must_use]
    pub const fn priority(&self) -> LeadPriority {
        self.priority
    }

    /// Returns the annotation stored by the last commit.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the potential classification stored by the last commit.
    #[must_use]
    pub const fn potential_level(&self) -> Option<PotentialLevel> {
        self.potential_level
    }

    /// Returns the call recording reference stored by the last commit.
    #[must_use]
    pub fn recording_ref(&self) -> Option<&str> {
        self.recording_ref.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the lead left the pending pool, if it has.
    #[must_use]
    pub const fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Returns the last mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when a claimant may take this lead: it is pending and
    /// its lease is absent or older than `cutoff`.
    #[must_use]
    pub fn is_claimable(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_leasable() && self.lease.is_none_or(|lease| lease.is_stale(cutoff))
    }

    /// Returns `true` when `agent_id` holds a lease newer than `cutoff` on
    /// this pending lead.
    #[must_use]
    pub fn is_leased_by(&self, agent_id: AgentId, cutoff: DateTime<Utc>) -> bool {
        self.status.is_leasable()
            && self
                .lease
                .is_some_and(|lease| lease.is_fresh_for(agent_id, cutoff))
    }

    /// Places a lease for `agent_id` stamped at `now`, replacing any
    /// previous lease.
    ///
    /// Callers decide whether the replacement is allowed; this only guards
    /// the status half of the mutual-exclusion invariant.
    ///
    /// # Errors
    ///
    /// Returns [`LeadDomainError::NotLeasable`] when the lead is not pending.
    pub fn lease_to(&mut self, agent_id: AgentId, now: DateTime<Utc>) -> Result<(), LeadDomainError> {
        if !self.status.is_leasable() {
            return Err(LeadDomainError::NotLeasable(self.id));
        }
        self.lease = Some(Lease::new(agent_id, now));
        self.updated_at = now;
        Ok(())
    }

    /// Drops any lease. Returns `true` when a lease was present.
    pub fn clear_lease(&mut self, now: DateTime<Utc>) -> bool {
        let had_lease = self.lease.take().is_some();
        if had_lease {
            self.updated_at = now;
        }
        had_lease
    }

    /// Changes ownership and drops any lease in the same mutation.
    pub fn reassign(&mut self, assigned_to: Option<AgentId>, now: DateTime<Utc>) {
        self.assigned_to = assigned_to;
        self.lease = None;
        self.updated_at = now;
    }

    /// Applies a validated work outcome: moves the lead out of `pending`,
    /// stores the annotation, stamps `processed_at`, and drops the lease.
    ///
    /// # Errors
    ///
    /// Returns [`LeadDomainError::NotLeasable`] when the lead has already
    /// left the pending pool.
    pub fn record_outcome(
        &mut self,
        outcome: &ValidatedOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), LeadDomainError> {
        if !self.status.is_leasable() {
            return Err(LeadDomainError::NotLeasable(self.id));
        }
        self.status = outcome.target_status();
        self.notes = Some(outcome.notes().to_owned());
        self.potential_level = Some(outcome.potential_level());
        self.recording_ref = outcome.recording_ref().map(str::to_owned);
        self.lease = None;
        self.processed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
