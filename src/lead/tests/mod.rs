//! Unit tests for lead leasing.


use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

use crate::lead::{
    adapters::memory::{InMemoryActivityLog, InMemoryLeadRepository},
    domain::{
        ActivityEventType, ActivityRecord, AgentId, CommitOutcome, Lead, LeadId, LeadPriority,
        LeadStatus, LeasePolicy, OutcomeAction, PersistedLeadData, PotentialLevel,
    },
    ports::{ActivityLog, LeadRepository},
    services::{
        CommitProcessor, LeaseManager, QueuePuller, RevocationService, StaleLeaseReaper,
        TransferService,
    },
};

pub(crate) type TestLeases = LeaseManager<InMemoryLeadRepository, ManualClock>;
pub(crate) type TestPuller = QueuePuller<InMemoryLeadRepository, InMemoryActivityLog, ManualClock>;

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub(crate) fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub(crate) fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub(crate) fn utc_now(&self) -> DateTime<Utc> {
        self.utc()
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0)
        .single()
        .expect("fixed test instant should be unambiguous")
}

/// Adapters and clock shared by one test.
pub(crate) struct Harness {
    pub(crate) repository: Arc<InMemoryLeadRepository>,
    pub(crate) activity: Arc<InMemoryActivityLog>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) policy: LeasePolicy,
}

impl Harness {
    pub(crate) fn new(policy: LeasePolicy) -> Self {
        Self {
            repository: Arc::new(InMemoryLeadRepository::new()),
            activity: Arc::new(InMemoryActivityLog::new()),
            clock: Arc::new(ManualClock::starting_at(epoch())),
            policy,
        }
    }

    pub(crate) fn leases(&self) -> TestLeases {
        LeaseManager::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.clock),
            self.policy,
        )
    }

    pub(crate) fn reaper(&self) -> StaleLeaseReaper<InMemoryLeadRepository, ManualClock> {
        StaleLeaseReaper::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.clock),
            self.policy,
        )
    }

    pub(crate) fn scripted(&self) -> scripted::ScriptedRepository {
        scripted::ScriptedRepository::wrapping(
            Arc::clone(&self.repository),
            Arc::clone(&self.clock),
        )
    }

    pub(crate) fn puller_over<R: LeadRepository>(
        &self,
        repository: R,
    ) -> QueuePuller<R, InMemoryActivityLog, ManualClock> {
        QueuePuller::new(
            Arc::new(repository),
            Arc::clone(&self.activity),
            Arc::clone(&self.clock),
            self.policy,
        )
    }

    pub(crate) fn puller(&self) -> TestPuller {
        QueuePuller::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.activity),
            Arc::clone(&self.clock),
            self.policy,
        )
    }

    pub(crate) fn commits(
        &self,
    ) -> CommitProcessor<InMemoryLeadRepository, InMemoryActivityLog, ManualClock> {
        CommitProcessor::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.activity),
            Arc::clone(&self.clock),
            self.policy,
        )
    }

    pub(crate) fn revocations(
        &self,
    ) -> RevocationService<InMemoryLeadRepository, InMemoryActivityLog, ManualClock> {
        RevocationService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.activity),
            Arc::clone(&self.clock),
        )
    }

    pub(crate) fn transfers(
        &self,
    ) -> TransferService<InMemoryLeadRepository, InMemoryActivityLog, ManualClock> {
        TransferService::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.activity),
            Arc::clone(&self.clock),
        )
    }

    pub(crate) async fn events(&self, lead: &Lead) -> Vec<ActivityEventType> {
        self.activity
            .list_for_lead(lead.id())
            .await
            .expect("activity listing should succeed")
            .iter()
            .map(ActivityRecord::event_type)
            .collect()
    }

    /// Stores a pending lead for `agent`, one second after the previous one.
    pub(crate) async fn distribute(&self, agent: AgentId) -> Lead {
        self.clock.advance(TimeDelta::seconds(1));
        let lead = Lead::new(Some(agent), &*self.clock);
        self.repository
            .store(&lead)
            .await
            .expect("storing a fresh lead should succeed");
        lead
    }

    /// Stores a lead for `agent` that has already left the pending pool.
    pub(crate) async fn distribute_finished(&self, agent: AgentId, status: LeadStatus) -> Lead {
        self.clock.advance(TimeDelta::seconds(1));
        let now = self.clock.utc();
        let lead = Lead::from_persisted(PersistedLeadData {
            id: LeadId::new(),
            status,
            assigned_to: Some(agent),
            current_agent_id: None,
            locked_at: None,
            batch_id: None,
            priority: LeadPriority::default(),
            notes: Some("Closed out in an earlier session".to_owned()),
            potential_level: Some(PotentialLevel::Low),
            recording_ref: None,
            created_at: now,
            processed_at: Some(now),
            updated_at: now,
        })
        .expect("finished lead without a lease should load");
        self.repository
            .store(&lead)
            .await
            .expect("storing a finished lead should succeed");
        lead
    }

    pub(crate) async fn reload(&self, lead: &Lead) -> Lead {
        self.repository
            .find_by_id(lead.id())
            .await
            .expect("lookup should succeed")
            .expect("lead should exist")
    }
}

#[fixture]
pub(crate) fn harness() -> Harness {
    Harness::new(LeasePolicy::default())
}

pub(crate) fn contacted_outcome() -> CommitOutcome {
    CommitOutcome::new(OutcomeAction::Contacted, "Spoke with the owner, call back Friday")
        .with_potential_level(PotentialLevel::Medium)
}
