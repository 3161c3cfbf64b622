//! `PostgreSQL` activity log.

use super::{
    blocking::{LeadPgPool, get_conn_with, run_blocking_with},
    models::{ActivityRow, NewActivityRow},
    schema::lead_activity,
};
use crate::lead::{
    domain::{ActivityEventType, ActivityId, ActivityRecord, AgentId, LeadId},
    ports::{ActivityLog, ActivityLogError, ActivityLogResult},
};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL`-backed append-only activity log.
#[derive(Debug, Clone)]
pub struct PostgresActivityLog {
    pool: LeadPgPool,
}

impl PostgresActivityLog {
    /// Creates a new activity log from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: LeadPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLog for PostgresActivityLog {
    async fn append(&self, record: &ActivityRecord) -> ActivityLogResult<()> {
        let pool = self.pool.clone();
        let record_id = record.id();
        let new_row = NewActivityRow {
            id: record_id.into_inner(),
            lead_id: record.lead_id().into_inner(),
            agent_id: record.agent_id().into_inner(),
            event_type: record.event_type().as_str().to_owned(),
            metadata: record.metadata().clone(),
            recorded_at: record.recorded_at(),
        };

        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, ActivityLogError::persistence)?;
                diesel::insert_into(lead_activity::table)
                    .values(&new_row)
                    .execute(&mut connection)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            ActivityLogError::DuplicateRecord(record_id)
                        }
                        _ => ActivityLogError::persistence(err),
                    })?;
                Ok(())
            },
            ActivityLogError::persistence,
        )
        .await
    }

    async fn list_for_lead(&self, lead_id: LeadId) -> ActivityLogResult<Vec<ActivityRecord>> {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection = get_conn_with(&pool, ActivityLogError::persistence)?;
                let rows = lead_activity::table
                    .filter(lead_activity::lead_id.eq(lead_id.into_inner()))
                    .order(lead_activity::seq.asc())
                    .select(ActivityRow::as_select())
                    .load::<ActivityRow>(&mut connection)
                    .map_err(ActivityLogError::persistence)?;
                rows.into_iter().map(row_to_record).collect()
            },
            ActivityLogError::persistence,
        )
        .await
    }
}

fn row_to_record(row: ActivityRow) -> ActivityLogResult<ActivityRecord> {
    let event_type = ActivityEventType::try_from(row.event_type.as_str())
        .map_err(ActivityLogError::persistence)?;
    Ok(ActivityRecord::from_persisted(
        ActivityId::from_uuid(row.id),
        LeadId::from_uuid(row.lead_id),
        AgentId::from_uuid(row.agent_id),
        event_type,
        row.metadata,
        row.recorded_at,
    ))
}
