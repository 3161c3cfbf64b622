//! Shared test helpers for in-memory lead leasing integration tests.

use std::sync::Arc;

use chrono::TimeDelta;
use leadlease::lead::{
    adapters::memory::{InMemoryActivityLog, InMemoryLeadRepository},
    domain::{AgentId, CommitOutcome, Lead, LeasePolicy, OutcomeAction, PotentialLevel},
    ports::LeadRepository,
    services::LeadDesk,
};
use mockable::Clock;
use rstest::fixture;

pub use crate::test_helpers::SteppedClock;

/// Desk type used across the in-memory suites.
pub type TestDesk = LeadDesk<InMemoryLeadRepository, InMemoryActivityLog, SteppedClock>;

/// Desk plus handles on the adapters it was built from.
pub struct DeskHarness {
    pub desk: TestDesk,
    pub activity: Arc<InMemoryActivityLog>,
    pub clock: Arc<SteppedClock>,
}

impl DeskHarness {
    /// Builds a harness with `policy`.
    ///
    /// # Panics
    ///
    /// Panics when `policy` is invalid.
    #[must_use]
    pub fn with_policy(policy: LeasePolicy) -> Self {
        let activity = Arc::new(InMemoryActivityLog::new());
        let clock = Arc::new(SteppedClock::new());
        let desk = LeadDesk::new(
            Arc::new(InMemoryLeadRepository::new()),
            Arc::clone(&activity),
            Arc::clone(&clock),
            policy,
        )
        .expect("test policy should validate");
        Self {
            desk,
            activity,
            clock,
        }
    }

    /// Distributes `count` pending leads to `agent`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics when storing a lead fails.
    pub async fn distribute(&self, agent: AgentId, count: usize) -> Vec<Lead> {
        let mut leads = Vec::with_capacity(count);
        for _ in 0..count {
            self.clock.advance(TimeDelta::seconds(1));
            let lead = Lead::new(Some(agent), &*self.clock);
            self.desk
                .distribute(&lead)
                .await
                .expect("distributing a fresh lead should succeed");
            leads.push(lead);
        }
        leads
    }

    /// Reloads a lead through the desk.
    ///
    /// # Panics
    ///
    /// Panics when the lead is missing.
    pub async fn reload(&self, lead: &Lead) -> Lead {
        self.desk
            .lead(lead.id())
            .await
            .expect("lookup should succeed")
            .expect("lead should exist")
    }
}

/// Provides a harness with the default policy.
#[fixture]
pub fn harness() -> DeskHarness {
    DeskHarness::with_policy(LeasePolicy::default())
}

/// A valid `contacted` outcome.
#[must_use]
pub fn contacted() -> CommitOutcome {
    CommitOutcome::new(OutcomeAction::Contacted, "Left details with reception")
        .with_potential_level(PotentialLevel::Medium)
}

/// Provides a shared repository for racing sessions.
#[fixture]
pub fn shared_repository() -> Arc<InMemoryLeadRepository> {
    Arc::new(InMemoryLeadRepository::new())
}

/// Stores a lead directly in `repository`.
///
/// # Panics
///
/// Panics when storing fails.
pub async fn seed(repository: &InMemoryLeadRepository, agent: AgentId, clock: &impl Clock) -> Lead {
    let lead = Lead::new(Some(agent), clock);
    repository
        .store(&lead)
        .await
        .expect("seeding a lead should succeed");
    lead
}
