//! Racing sessions against one shared lease store.

use std::collections::HashSet;
use std::sync::Arc;

use crate::in_memory::helpers::{contacted, seed, shared_repository};
use leadlease::lead::{
    adapters::memory::{InMemoryActivityLog, InMemoryLeadRepository},
    domain::{AgentId, LeasePolicy, RevocationMode},
    services::{CommitError, LeadDesk, LeaseManager, PullOutcome},
};
use mockable::DefaultClock;
use rstest::rstest;

const SESSIONS: usize = 16;

type SessionDesk = LeadDesk<InMemoryLeadRepository, InMemoryActivityLog, DefaultClock>;

fn desk(repository: &Arc<InMemoryLeadRepository>) -> SessionDesk {
    LeadDesk::new(
        Arc::clone(repository),
        Arc::new(InMemoryActivityLog::new()),
        Arc::new(DefaultClock),
        LeasePolicy::default(),
    )
    .expect("default policy should validate")
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_claims_produce_exactly_one_holder(shared_repository: Arc<InMemoryLeadRepository>) {
    let lead = seed(&shared_repository, AgentId::new(), &DefaultClock).await;
    let mut handles = Vec::with_capacity(SESSIONS);
    for _ in 0..SESSIONS {
        let leases = LeaseManager::new(
            Arc::clone(&shared_repository),
            Arc::new(DefaultClock),
            LeasePolicy::default(),
        );
        let lead_id = lead.id();
        handles.push(tokio::spawn(async move {
            let agent = AgentId::new();
            leases.claim(lead_id, agent).await.map(|_| agent)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let result = handle.await.expect("claim task should not panic");
        match result {
            Ok(agent) => winners.push(agent),
            Err(err) => assert!(err.is_conflict(), "unexpected claim failure: {err}"),
        }
    }

    let [winner] = winners.as_slice() else {
        panic!("expected a single winner, got {winners:?}");
    };
    let stored = desk(&shared_repository)
        .lead(lead.id())
        .await
        .expect("lookup should succeed")
        .expect("lead should exist");
    assert_eq!(stored.current_agent_id(), Some(*winner));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_of_one_agent_get_distinct_leads(
    shared_repository: Arc<InMemoryLeadRepository>,
) {
    let agent = AgentId::new();
    for _ in 0..SESSIONS {
        seed(&shared_repository, agent, &DefaultClock).await;
    }
    let mut handles = Vec::with_capacity(SESSIONS);
    for _ in 0..SESSIONS {
        let session = desk(&shared_repository);
        handles.push(tokio::spawn(async move { session.pull_next(agent).await }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let outcome = handle
            .await
            .expect("pull task should not panic")
            .expect("pull should succeed");
        let PullOutcome::Leased(lead) = outcome else {
            panic!("every session should find a free lead");
        };
        assert!(seen.insert(lead.id()), "lead {} served twice", lead.id());
    }
    assert_eq!(seen.len(), SESSIONS);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn commit_racing_revocation_never_leaves_a_lease_on_a_finished_lead(
    shared_repository: Arc<InMemoryLeadRepository>,
) {
    let agent = AgentId::new();
    let session = desk(&shared_repository);
    let manager = desk(&shared_repository);
    let lead = seed(&shared_repository, agent, &DefaultClock).await;
    session
        .pull_next(agent)
        .await
        .expect("pull should succeed");

    let lead_id = lead.id();
    let commit = tokio::spawn(async move { session.commit(lead_id, agent, contacted()).await });
    let revoke =
        tokio::spawn(async move { manager.revoke_all(agent, RevocationMode::Unlock).await });
    let commit_result = commit.await.expect("commit task should not panic");
    let revoke_result = revoke
        .await
        .expect("revoke task should not panic")
        .expect("revocation should succeed");

    let stored = desk(&shared_repository)
        .lead(lead_id)
        .await
        .expect("lookup should succeed")
        .expect("lead should exist");
    assert!(stored.lease().is_none());
    match commit_result {
        Ok(_) => assert!(!stored.status().is_leasable()),
        Err(CommitError::Conflict(_)) => {
            assert_eq!(revoke_result.affected, vec![lead_id]);
            assert!(stored.status().is_leasable());
        }
        Err(other) => panic!("unexpected commit failure: {other}"),
    }
}
