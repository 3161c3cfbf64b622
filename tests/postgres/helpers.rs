//! Per-test database context for the `PostgreSQL` suites.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::{TemporaryDatabase, test_runtime};
use chrono::TimeDelta;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use leadlease::lead::{
    adapters::postgres::{LeadPgPool, PostgresActivityLog, PostgresLeadRepository},
    domain::{AgentId, Lead, LeasePolicy},
    ports::LeadRepository,
    services::LeadDesk,
};
use rstest::fixture;
use std::sync::Arc;
use tokio::runtime::Runtime;

pub use crate::test_helpers::SteppedClock;

/// Schema under test.
pub const CREATE_LEADS_SQL: &str =
    include_str!("../../migrations/2026-01-12-000000_create_leads/up.sql");

/// Pre-migrated database each test copies.
pub const TEMPLATE_DB: &str = "leadlease_test_template";

/// Desk over the `PostgreSQL` adapters.
pub type PgDesk = LeadDesk<PostgresLeadRepository, PostgresActivityLog, SteppedClock>;

/// Adapters, desk, and runtime bound to one temporary database.
///
/// Fields drop in order, so the pool closes before the database goes.
pub struct PgContext {
    pub desk: PgDesk,
    pub repository: Arc<PostgresLeadRepository>,
    pub activity: Arc<PostgresActivityLog>,
    pub clock: Arc<SteppedClock>,
    pub rt: Runtime,
    db: TemporaryDatabase,
}

impl PgContext {
    /// Stores a pending lead for `agent`, one second after the previous one.
    pub fn distribute(&self, agent: AgentId) -> Lead {
        self.clock.advance(TimeDelta::seconds(1));
        let lead = Lead::new(Some(agent), &*self.clock);
        self.rt
            .block_on(self.repository.store(&lead))
            .expect("storing a fresh lead should succeed");
        lead
    }

    /// Reloads `lead` from the database.
    pub fn reload(&self, lead: &Lead) -> Lead {
        self.rt
            .block_on(self.repository.find_by_id(lead.id()))
            .expect("lookup should succeed")
            .expect("lead should exist")
    }

    /// Runs raw SQL against the test database.
    ///
    /// # Errors
    ///
    /// Returns connection and statement failures.
    pub fn execute_sql(&self, sql: &str) -> Result<(), BoxError> {
        let mut conn =
            PgConnection::establish(self.db.url()).map_err(|err| Box::new(err) as BoxError)?;
        conn.batch_execute(sql)
            .map_err(|err| Box::new(err) as BoxError)
    }
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_LEADS_SQL)
        .map_err(|err| Box::new(err) as BoxError)
}

fn build_context(cluster: PostgresCluster, policy: LeasePolicy) -> Result<PgContext, BoxError> {
    cluster.ensure_template(TEMPLATE_DB, apply_migrations)?;
    let db = cluster.temporary_database(TEMPLATE_DB)?;
    let pool: LeadPgPool = Pool::builder()
        .max_size(2)
        .build(ConnectionManager::<PgConnection>::new(db.url()))
        .map_err(|err| Box::new(err) as BoxError)?;
    let repository = Arc::new(PostgresLeadRepository::new(pool.clone()));
    let activity = Arc::new(PostgresActivityLog::new(pool));
    let clock = Arc::new(SteppedClock::new());
    let desk = LeadDesk::new(
        Arc::clone(&repository),
        Arc::clone(&activity),
        Arc::clone(&clock),
        policy,
    )
    .map_err(|err| Box::new(err) as BoxError)?;
    Ok(PgContext {
        desk,
        repository,
        activity,
        clock,
        rt: test_runtime()?,
        db,
    })
}

/// Context with the default leasing policy.
#[fixture]
pub fn pg(postgres_cluster: PostgresCluster) -> PgContext {
    build_context(postgres_cluster, LeasePolicy::default()).expect("postgres test context")
}
