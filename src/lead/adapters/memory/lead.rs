//! In-memory lease store.
//!
//! Each conditional write runs entirely under one write guard, which plays
//! the part of the row-level atomicity a relational store provides.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::lead::{
    domain::{AgentId, Lead, LeadDomainError, LeadId, QueueOrder, RevocationMode},
    ports::{
        CandidateQuery, CommitWrite, LeadRepository, LeadRepositoryError, LeadRepositoryResult,
        Reassignment,
    },
};

/// Thread-safe in-memory lead repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeadRepository {
    state: Arc<RwLock<InMemoryLeadState>>,
}

#[derive(Debug, Default)]
struct InMemoryLeadState {
    leads: HashMap<LeadId, Lead>,
}

impl InMemoryLeadRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LeadRepositoryResult<RwLockReadGuard<'_, InMemoryLeadState>> {
        self.state.read().map_err(|err| {
            LeadRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> LeadRepositoryResult<RwLockWriteGuard<'_, InMemoryLeadState>> {
        self.state.write().map_err(|err| {
            LeadRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    /// Runs `apply` on the lead when `precondition` holds, under one guard.
    fn update_if<P, F>(
        &self,
        id: LeadId,
        precondition: P,
        apply: F,
    ) -> LeadRepositoryResult<Option<Lead>>
    where
        P: FnOnce(&Lead) -> bool,
        F: FnOnce(&mut Lead) -> Result<(), LeadDomainError>,
    {
        let mut state = self.write()?;
        let Some(lead) = state.leads.get_mut(&id) else {
            return Ok(None);
        };
        if !precondition(lead) {
            return Ok(None);
        }
        apply(lead).map_err(LeadRepositoryError::persistence)?;
        Ok(Some(lead.clone()))
    }
}

fn sort_candidates(candidates: &mut [Lead], order: QueueOrder) {
    match order {
        QueueOrder::OldestFirst => candidates.sort_by_key(|lead| (lead.created_at(), lead.id())),
        QueueOrder::Priority => candidates
            .sort_by_key(|lead| (Reverse(lead.priority()), lead.created_at(), lead.id())),
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn store(&self, lead: &Lead) -> LeadRepositoryResult<()> {
        let mut state = self.write()?;
        if state.leads.contains_key(&lead.id()) {
            return Err(LeadRepositoryError::DuplicateLead(lead.id()));
        }
        state.leads.insert(lead.id(), lead.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: LeadId) -> LeadRepositoryResult<Option<Lead>> {
        let state = self.read()?;
        Ok(state.leads.get(&id).cloned())
    }

    async fn claimable_for_agent(
        &self,
        query: &CandidateQuery,
    ) -> LeadRepositoryResult<Vec<Lead>> {
        let state = self.read()?;
        let mut candidates: Vec<Lead> = state
            .leads
            .values()
            .filter(|lead| lead.assigned_to() == Some(query.agent_id))
            .filter(|lead| lead.is_claimable(query.stale_cutoff))
            .filter(|lead| !query.exclude.contains(&lead.id()))
            .cloned()
            .collect();
        sort_candidates(&mut candidates, query.order);
        candidates.truncate(query.limit);
        Ok(candidates)
    }

    async fn try_claim(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        self.update_if(
            id,
            |lead| lead.is_claimable(stale_cutoff),
            |lead| lead.lease_to(agent_id, now),
        )
    }

    async fn try_claim_assigned(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        self.update_if(
            id,
            |lead| lead.assigned_to() == Some(agent_id) && lead.is_claimable(stale_cutoff),
            |lead| lead.lease_to(agent_id, now),
        )
    }

    async fn try_renew(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        self.update_if(
            id,
            |lead| lead.is_leased_by(agent_id, stale_cutoff),
            |lead| lead.lease_to(agent_id, now),
        )
    }

    async fn release_held(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        self.update_if(
            id,
            |lead| lead.current_agent_id() == Some(agent_id),
            |lead| {
                lead.clear_lease(now);
                Ok(())
            },
        )
    }

    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Vec<LeadId>> {
        let mut state = self.write()?;
        let mut released = Vec::new();
        for lead in state.leads.values_mut() {
            if lead.lease().is_some_and(|lease| lease.is_stale(cutoff)) {
                lead.clear_lease(now);
                released.push(lead.id());
            }
        }
        released.sort();
        Ok(released)
    }

    async fn try_commit(&self, write: &CommitWrite) -> LeadRepositoryResult<Option<Lead>> {
        self.update_if(
            write.lead_id,
            |lead| lead.is_leased_by(write.agent_id, write.stale_cutoff),
            |lead| lead.record_outcome(&write.outcome, write.now),
        )
    }

    async fn pending_assigned_to(&self, agent_id: AgentId) -> LeadRepositoryResult<Vec<LeadId>> {
        let state = self.read()?;
        let mut pending: Vec<&Lead> = state
            .leads
            .values()
            .filter(|lead| lead.status().is_leasable() && lead.assigned_to() == Some(agent_id))
            .collect();
        pending.sort_by_key(|lead| (lead.created_at(), lead.id()));
        Ok(pending.into_iter().map(Lead::id).collect())
    }

    async fn leases_held_by(&self, agent_id: AgentId) -> LeadRepositoryResult<Vec<LeadId>> {
        let state = self.read()?;
        let mut held: Vec<&Lead> = state
            .leads
            .values()
            .filter(|lead| lead.status().is_leasable() && lead.current_agent_id() == Some(agent_id))
            .collect();
        held.sort_by_key(|lead| (lead.created_at(), lead.id()));
        Ok(held.into_iter().map(Lead::id).collect())
    }

    async fn force_release(
        &self,
        id: LeadId,
        assignee: AgentId,
        mode: RevocationMode,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        self.update_if(
            id,
            |lead| {
                let owned_and_pending =
                    lead.status().is_leasable() && lead.assigned_to() == Some(assignee);
                match mode {
                    RevocationMode::Unlock => owned_and_pending && lead.lease().is_some(),
                    RevocationMode::UnassignAndUnlock => owned_and_pending,
                }
            },
            |lead| {
                match mode {
                    RevocationMode::Unlock => {
                        lead.clear_lease(now);
                    }
                    RevocationMode::UnassignAndUnlock => lead.reassign(None, now),
                }
                Ok(())
            },
        )
    }

    async fn reassign(
        &self,
        id: LeadId,
        target: AgentId,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Reassignment>> {
        let mut state = self.write()?;
        let Some(lead) = state.leads.get_mut(&id) else {
            return Ok(None);
        };
        let previous_assignee = lead.assigned_to();
        lead.reassign(Some(target), now);
        Ok(Some(Reassignment {
            lead: lead.clone(),
            previous_assignee,
        }))
    }
}
