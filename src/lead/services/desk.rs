//! Single entry point bundling the lead services over shared adapters.

use super::{
    CommitProcessor, CommitResult, LeaseManager, LeaseResult, PullOutcome, PullResult,
    QueuePuller, ResumeOutcome, RevocationError, RevocationReport, RevocationService,
    StaleLeaseReaper, SweepReport, TransferResult, TransferService,
};
use crate::lead::{
    domain::{AgentId, CommitOutcome, Lead, LeadId, LeasePolicy, LeasePolicyError, RevocationMode},
    ports::{ActivityLog, LeadRepository, LeadRepositoryResult},
};
use mockable::Clock;
use std::sync::Arc;

/// Agent and manager operations over one lease store and activity log.
///
/// # Examples
///
/// ```
/// use leadlease::lead::{
///     adapters::memory::{InMemoryActivityLog, InMemoryLeadRepository},
///     domain::LeasePolicy,
///     services::LeadDesk,
/// };
/// use mockable::DefaultClock;
/// use std::sync::Arc;
///
/// let desk = LeadDesk::new(
///     Arc::new(InMemoryLeadRepository::new()),
///     Arc::new(InMemoryActivityLog::new()),
///     Arc::new(DefaultClock),
///     LeasePolicy::default(),
/// );
/// assert!(desk.is_ok());
/// ```
#[derive(Clone)]
pub struct LeadDesk<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    leases: LeaseManager<R, C>,
    reaper: StaleLeaseReaper<R, C>,
    puller: QueuePuller<R, L, C>,
    commits: CommitProcessor<R, L, C>,
    revocations: RevocationService<R, L, C>,
    transfers: TransferService<R, L, C>,
}

impl<R, L, C> LeadDesk<R, L, C>
where
    R: LeadRepository,
    L: ActivityLog,
    C: Clock + Send + Sync,
{
    /// Validates `policy` and wires every service to the given adapters.
    ///
    /// # Errors
    ///
    /// Returns [`LeasePolicyError`] when the policy is inconsistent.
    pub fn new(
        repository: Arc<R>,
        activity: Arc<L>,
        clock: Arc<C>,
        policy: LeasePolicy,
    ) -> Result<Self, LeasePolicyError> {
        let validated = policy.validate()?;
        Ok(Self {
            leases: LeaseManager::new(Arc::clone(&repository), Arc::clone(&clock), validated),
            reaper: StaleLeaseReaper::new(Arc::clone(&repository), Arc::clone(&clock), validated),
            puller: QueuePuller::new(
                Arc::clone(&repository),
                Arc::clone(&activity),
                Arc::clone(&clock),
                validated,
            ),
            commits: CommitProcessor::new(
                Arc::clone(&repository),
                Arc::clone(&activity),
                Arc::clone(&clock),
                validated,
            ),
            revocations: RevocationService::new(
                Arc::clone(&repository),
                Arc::clone(&activity),
                Arc::clone(&clock),
            ),
            transfers: TransferService::new(Arc::clone(&repository), activity, clock),
            repository,
        })
    }

    /// Returns the validated policy.
    #[must_use]
    pub const fn policy(&self) -> &LeasePolicy {
        self.leases.policy()
    }

    /// Stores a newly distributed lead.
    ///
    /// # Errors
    ///
    /// Propagates repository failures, including duplicate identifiers.
    pub async fn distribute(&self, lead: &Lead) -> LeadRepositoryResult<()> {
        self.repository.store(lead).await
    }

    /// Looks up a lead.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn lead(&self, lead_id: LeadId) -> LeadRepositoryResult<Option<Lead>> {
        self.repository.find_by_id(lead_id).await
    }

    /// See [`QueuePuller::pull_next`].
    ///
    /// # Errors
    ///
    /// Propagates [`QueuePuller::pull_next`] failures.
    pub async fn pull_next(&self, agent_id: AgentId) -> PullResult<PullOutcome> {
        self.puller.pull_next(agent_id).await
    }

    /// See [`QueuePuller::resume`].
    ///
    /// # Errors
    ///
    /// Propagates [`QueuePuller::resume`] failures.
    pub async fn resume(
        &self,
        agent_id: AgentId,
        remembered: Option<LeadId>,
    ) -> PullResult<ResumeOutcome> {
        self.puller.resume(agent_id, remembered).await
    }

    /// See [`LeaseManager::claim`].
    ///
    /// # Errors
    ///
    /// Propagates [`LeaseManager::claim`] failures.
    pub async fn claim(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<Lead> {
        self.leases.claim(lead_id, agent_id).await
    }

    /// See [`LeaseManager::renew`].
    ///
    /// # Errors
    ///
    /// Propagates [`LeaseManager::renew`] failures.
    pub async fn renew(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<Lead> {
        self.leases.renew(lead_id, agent_id).await
    }

    /// See [`LeaseManager::release`].
    ///
    /// # Errors
    ///
    /// Propagates [`LeaseManager::release`] failures.
    pub async fn release(&self, lead_id: LeadId, agent_id: AgentId) -> LeaseResult<bool> {
        self.leases.release(lead_id, agent_id).await
    }

    /// See [`CommitProcessor::commit`].
    ///
    /// # Errors
    ///
    /// Propagates [`CommitProcessor::commit`] failures.
    pub async fn commit(
        &self,
        lead_id: LeadId,
        agent_id: AgentId,
        outcome: CommitOutcome,
    ) -> CommitResult<Lead> {
        self.commits.commit(lead_id, agent_id, outcome).await
    }

    /// See [`RevocationService::revoke_all`].
    ///
    /// # Errors
    ///
    /// Propagates [`RevocationService::revoke_all`] failures.
    pub async fn revoke_all(
        &self,
        agent_id: AgentId,
        mode: RevocationMode,
    ) -> Result<RevocationReport, RevocationError> {
        self.revocations.revoke_all(agent_id, mode).await
    }

    /// See [`TransferService::transfer`].
    pub async fn transfer(&self, lead_ids: &[LeadId], target: AgentId) -> Vec<TransferResult> {
        self.transfers.transfer(lead_ids, target).await
    }

    /// See [`StaleLeaseReaper::sweep`].
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn sweep(&self) -> LeadRepositoryResult<SweepReport> {
        self.reaper.sweep().await
    }

    /// See [`StaleLeaseReaper::sweep_stuck`].
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn sweep_stuck(&self) -> LeadRepositoryResult<SweepReport> {
        self.reaper.sweep_stuck().await
    }
}
