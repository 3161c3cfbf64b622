//! Activity log persistence and its append-only guarantee.

use crate::postgres::helpers::{PgContext, pg};
use leadlease::lead::{
    domain::{ActivityEventType, ActivityRecord, AgentId},
    ports::{ActivityLog, ActivityLogError},
};
use rstest::rstest;
use serde_json::json;

#[rstest]
fn records_list_in_append_order(pg: PgContext) {
    let agent = AgentId::new();
    let lead = pg.distribute(agent);
    let viewed = ActivityRecord::new(
        lead.id(),
        agent,
        ActivityEventType::Viewed,
        json!({}),
        &*pg.clock,
    );
    let revoked = ActivityRecord::new(
        lead.id(),
        agent,
        ActivityEventType::LeaseRevoked,
        json!({ "mode": "unlock" }),
        &*pg.clock,
    );
    for record in [&viewed, &revoked] {
        pg.rt
            .block_on(pg.activity.append(record))
            .expect("append should succeed");
    }

    let listed = pg
        .rt
        .block_on(pg.activity.list_for_lead(lead.id()))
        .expect("listing should succeed");

    assert_eq!(listed, vec![viewed, revoked]);
}

#[rstest]
fn duplicate_record_is_rejected(pg: PgContext) {
    let agent = AgentId::new();
    let lead = pg.distribute(agent);
    let record = ActivityRecord::new(
        lead.id(),
        agent,
        ActivityEventType::Viewed,
        json!({}),
        &*pg.clock,
    );
    pg.rt
        .block_on(pg.activity.append(&record))
        .expect("first append should succeed");

    let again = pg.rt.block_on(pg.activity.append(&record));

    assert!(matches!(again, Err(ActivityLogError::DuplicateRecord(id)) if id == record.id()));
}

#[rstest]
#[case("UPDATE lead_activity SET event_type = 'viewed'")]
#[case("DELETE FROM lead_activity")]
fn stored_records_cannot_be_changed(pg: PgContext, #[case] statement: &str) {
    let agent = AgentId::new();
    let lead = pg.distribute(agent);
    let record = ActivityRecord::new(
        lead.id(),
        agent,
        ActivityEventType::LeaseRevoked,
        json!({ "mode": "unlock" }),
        &*pg.clock,
    );
    pg.rt
        .block_on(pg.activity.append(&record))
        .expect("append should succeed");

    let err = pg
        .execute_sql(statement)
        .expect_err("append-only trigger should reject the statement");

    assert!(
        err.to_string().contains("lead_activity is append-only"),
        "unexpected error: {err}"
    );
    let listed = pg
        .rt
        .block_on(pg.activity.list_for_lead(lead.id()))
        .expect("listing should succeed");
    assert_eq!(listed, vec![record]);
}
