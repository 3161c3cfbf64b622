//! When steps for lead leasing BDD scenarios.

use super::world::{LeadLeasingWorld, run_async};
use chrono::TimeDelta;
use eyre::WrapErr;
use leadlease::lead::domain::{CommitOutcome, OutcomeAction, PotentialLevel, RevocationMode};
use rstest_bdd_macros::when;

#[when(r#"agent "{agent}" pulls the next lead"#)]
fn agent_pulls(world: &mut LeadLeasingWorld, agent: String) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent);
    run_async(world.desk.pull_next(agent_id)).wrap_err("pull next lead")?;
    Ok(())
}

#[when(r#"agent "{agent}" tries to claim lead {position:u64}"#)]
fn agent_tries_to_claim(
    world: &mut LeadLeasingWorld,
    agent: String,
    position: u64,
) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent);
    let lead_id = world.lead_id(position)?;
    world.last_claim = Some(run_async(world.desk.claim(lead_id, agent_id)));
    Ok(())
}

#[when("{seconds:u64} seconds pass")]
fn seconds_pass(world: &mut LeadLeasingWorld, seconds: u64) -> Result<(), eyre::Report> {
    world
        .clock
        .advance(TimeDelta::seconds(i64::try_from(seconds)?));
    Ok(())
}

#[when(r#"agent "{agent}" commits lead {position:u64} with note "{note}""#)]
fn agent_commits(
    world: &mut LeadLeasingWorld,
    agent: String,
    position: u64,
    note: String,
) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent);
    let lead_id = world.lead_id(position)?;
    let outcome = CommitOutcome::new(OutcomeAction::Contacted, note)
        .with_potential_level(PotentialLevel::Medium);
    world.last_commit = Some(run_async(world.desk.commit(lead_id, agent_id, outcome)));
    Ok(())
}

#[when(r#"the manager transfers lead {position:u64} to agent "{agent}""#)]
fn manager_transfers(
    world: &mut LeadLeasingWorld,
    position: u64,
    agent: String,
) -> Result<(), eyre::Report> {
    let target = world.agent(&agent);
    let lead_id = world.lead_id(position)?;
    let results = run_async(world.desk.transfer(&[lead_id], target));
    eyre::ensure!(
        results.iter().all(|result| result.is_transferred()),
        "transfer failed: {results:?}"
    );
    Ok(())
}

#[when(r#"the manager unlocks every lead of agent "{agent}""#)]
fn manager_unlocks(world: &mut LeadLeasingWorld, agent: String) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent);
    let report = run_async(world.desk.revoke_all(agent_id, RevocationMode::Unlock))
        .wrap_err("revoke agent work")?;
    world.last_revocation = Some(report);
    Ok(())
}
