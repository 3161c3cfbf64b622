//! End-to-end agent sessions through the desk.

use chrono::TimeDelta;
use leadlease::lead::{
    domain::{ActivityEventType, AgentId, LeadStatus},
    ports::ActivityLog,
    services::{CommitError, PullOutcome, ResumeOutcome},
};
use rstest::rstest;

use crate::in_memory::helpers::{DeskHarness, contacted, harness};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agent_works_through_queue_in_order(harness: DeskHarness) {
    let agent = AgentId::new();
    let leads = harness.distribute(agent, 3).await;
    let mut worked = Vec::new();

    loop {
        let outcome = harness
            .desk
            .pull_next(agent)
            .await
            .expect("pull should succeed");
        let PullOutcome::Leased(lead) = outcome else {
            break;
        };
        harness
            .desk
            .commit(lead.id(), agent, contacted())
            .await
            .expect("commit should succeed");
        worked.push(lead.id());
    }

    let expected: Vec<_> = leads.iter().map(|lead| lead.id()).collect();
    assert_eq!(worked, expected);
    for lead in &leads {
        let reloaded = harness.reload(lead).await;
        assert_eq!(reloaded.status(), LeadStatus::Contacted);
        assert!(reloaded.lease().is_none());
        let events: Vec<_> = harness
            .activity
            .list_for_lead(lead.id())
            .await
            .expect("listing should succeed")
            .iter()
            .map(|record| record.event_type())
            .collect();
        assert_eq!(
            events,
            vec![ActivityEventType::Viewed, ActivityEventType::Contacted]
        );
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandoned_lead_returns_to_queue_after_ttl(harness: DeskHarness) {
    let agent = AgentId::new();
    let leads = harness.distribute(agent, 1).await;
    let first = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed");
    let second_session = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed");
    harness.clock.advance(TimeDelta::minutes(31));

    let after_ttl = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed");

    assert!(first.lead().is_some());
    assert_eq!(second_session, PullOutcome::Empty);
    assert_eq!(
        after_ttl.lead().map(|lead| lead.id()),
        leads.first().map(|lead| lead.id())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_release_frees_lead_for_next_pull(harness: DeskHarness) {
    let agent = AgentId::new();
    harness.distribute(agent, 1).await;
    let pulled = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed")
        .into_lead()
        .expect("a lead should be leased");

    let released = harness
        .desk
        .release(pulled.id(), agent)
        .await
        .expect("release should succeed");
    let again = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed");

    assert!(released);
    assert_eq!(again.lead().map(|lead| lead.id()), Some(pulled.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn heartbeat_keeps_a_long_session_alive(harness: DeskHarness) {
    let agent = AgentId::new();
    harness.distribute(agent, 1).await;
    let pulled = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed")
        .into_lead()
        .expect("a lead should be leased");

    for _ in 0..3 {
        harness.clock.advance(TimeDelta::minutes(20));
        harness
            .desk
            .renew(pulled.id(), agent)
            .await
            .expect("renewal within the ttl should succeed");
    }
    let committed = harness
        .desk
        .commit(pulled.id(), agent, contacted())
        .await
        .expect("commit should succeed");

    assert_eq!(committed.status(), LeadStatus::Contacted);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reload_resumes_then_expired_resume_is_flagged(harness: DeskHarness) {
    let agent = AgentId::new();
    harness.distribute(agent, 2).await;
    let pulled = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed")
        .into_lead()
        .expect("a lead should be leased");

    let resumed = harness
        .desk
        .resume(agent, Some(pulled.id()))
        .await
        .expect("resume should succeed");
    harness.clock.advance(TimeDelta::hours(1));
    let expired = harness
        .desk
        .resume(agent, Some(pulled.id()))
        .await
        .expect("resume should succeed");

    assert!(matches!(resumed, ResumeOutcome::Resumed(ref lead) if lead.id() == pulled.id()));
    assert!(matches!(expired, ResumeOutcome::Replaced { remembered, .. } if remembered == pulled.id()));
    assert_eq!(expired.lead().map(|lead| lead.id()), Some(pulled.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn commit_after_expiry_is_refused(harness: DeskHarness) {
    let agent = AgentId::new();
    harness.distribute(agent, 1).await;
    let pulled = harness
        .desk
        .pull_next(agent)
        .await
        .expect("pull should succeed")
        .into_lead()
        .expect("a lead should be leased");
    harness.clock.advance(TimeDelta::minutes(31));

    let result = harness.desk.commit(pulled.id(), agent, contacted()).await;

    assert!(matches!(result, Err(CommitError::Conflict(id)) if id == pulled.id()));
    assert_eq!(harness.reload(&pulled).await.status(), LeadStatus::Pending);
}
