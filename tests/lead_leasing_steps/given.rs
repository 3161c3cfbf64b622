//! Given steps for lead leasing BDD scenarios.

use super::world::{LeadLeasingWorld, run_async};
use chrono::TimeDelta;
use eyre::WrapErr;
use leadlease::lead::domain::Lead;
use rstest_bdd_macros::given;

#[given(r#"agent "{agent}" has been distributed {count:u64} leads"#)]
fn leads_distributed(
    world: &mut LeadLeasingWorld,
    agent: String,
    count: u64,
) -> Result<(), eyre::Report> {
    let owner = world.agent(&agent);
    for _ in 0..count {
        world.clock.advance(TimeDelta::seconds(1));
        let lead = Lead::new(Some(owner), &*world.clock);
        run_async(world.desk.distribute(&lead)).wrap_err("distribute lead for scenario")?;
        world.leads.push(lead);
    }
    Ok(())
}

#[given(r#"agent "{agent}" has pulled the next lead"#)]
fn agent_has_pulled(world: &mut LeadLeasingWorld, agent: String) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent);
    let outcome = run_async(world.desk.pull_next(agent_id)).wrap_err("pull in scenario setup")?;
    eyre::ensure!(outcome.lead().is_some(), "setup pull returned no lead");
    Ok(())
}

#[given(r#"agent "{agent}" has claimed lead {position:u64}"#)]
fn agent_has_claimed(
    world: &mut LeadLeasingWorld,
    agent: String,
    position: u64,
) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent);
    let lead_id = world.lead_id(position)?;
    run_async(world.desk.claim(lead_id, agent_id)).wrap_err("claim in scenario setup")?;
    Ok(())
}
