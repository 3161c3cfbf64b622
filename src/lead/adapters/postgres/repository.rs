//! `PostgreSQL` lease store.
//!
//! Lease mutations are single `UPDATE … WHERE <precondition> RETURNING`
//! statements. An empty result means the precondition did not hold when the
//! row was written, which is how contention surfaces to the services.

use super::{
    blocking::{LeadPgPool, PooledConn, get_conn_with, run_blocking_with},
    models::{LeadIdRow, LeadRow, NewLeadRow, ReassignedLeadRow},
    schema::leads,
};
use crate::lead::{
    domain::{
        AgentId, BatchId, Lead, LeadId, LeadPriority, LeadStatus, PersistedLeadData,
        PotentialLevel, QueueOrder, RevocationMode,
    },
    ports::{
        CandidateQuery, CommitWrite, LeadRepository, LeadRepositoryError, LeadRepositoryResult,
        Reassignment,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Array, Int8, Nullable, Text, Timestamptz, Uuid as SqlUuid};

const LEAD_COLUMNS: &str = "id, status, assigned_to, current_agent_id, locked_at, batch_id, \
     priority, notes, potential_level, recording_ref, created_at, processed_at, updated_at";

const QUALIFIED_LEAD_COLUMNS: &str = "leads.id, leads.status, leads.assigned_to, \
     leads.current_agent_id, leads.locked_at, leads.batch_id, leads.priority, leads.notes, \
     leads.potential_level, leads.recording_ref, leads.created_at, leads.processed_at, \
     leads.updated_at";

/// `PostgreSQL`-backed lead repository.
#[derive(Debug, Clone)]
pub struct PostgresLeadRepository {
    pool: LeadPgPool,
}

impl PostgresLeadRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: LeadPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> LeadRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> LeadRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking_with(
            move || {
                let mut connection: PooledConn =
                    get_conn_with(&pool, LeadRepositoryError::persistence)?;
                f(&mut connection)
            },
            LeadRepositoryError::persistence,
        )
        .await
    }
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn store(&self, lead: &Lead) -> LeadRepositoryResult<()> {
        let lead_id = lead.id();
        let new_row = to_new_row(lead);
        self.run_blocking(move |connection| {
            diesel::insert_into(leads::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        LeadRepositoryError::DuplicateLead(lead_id)
                    }
                    _ => LeadRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: LeadId) -> LeadRepositoryResult<Option<Lead>> {
        self.run_blocking(move |connection| {
            let row = leads::table
                .filter(leads::id.eq(id.into_inner()))
                .select(LeadRow::as_select())
                .first::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn claimable_for_agent(
        &self,
        query: &CandidateQuery,
    ) -> LeadRepositoryResult<Vec<Lead>> {
        let agent_id = query.agent_id.into_inner();
        let stale_cutoff = query.stale_cutoff;
        let exclude: Vec<uuid::Uuid> = query.exclude.iter().map(|id| id.into_inner()).collect();
        let limit = i64::try_from(query.limit).map_err(LeadRepositoryError::persistence)?;
        let order_by = match query.order {
            QueueOrder::OldestFirst => "created_at ASC, id ASC",
            QueueOrder::Priority => "priority DESC, created_at ASC, id ASC",
        };
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads \
             WHERE status = 'pending' AND assigned_to = $1 \
             AND (current_agent_id IS NULL OR locked_at < $2) \
             AND NOT (id = ANY($3)) \
             ORDER BY {order_by} LIMIT $4"
        );

        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(agent_id)
                .bind::<Timestamptz, _>(stale_cutoff)
                .bind::<Array<SqlUuid>, _>(exclude)
                .bind::<Int8, _>(limit)
                .load::<LeadRow>(connection)
                .map_err(LeadRepositoryError::persistence)?;
            rows.into_iter().map(row_to_lead).collect()
        })
        .await
    }

    async fn try_claim(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        let sql = format!(
            "UPDATE leads SET current_agent_id = $2, locked_at = $3, updated_at = $3 \
             WHERE id = $1 AND status = 'pending' \
             AND (current_agent_id IS NULL OR locked_at < $4) \
             RETURNING {LEAD_COLUMNS}"
        );
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(id.into_inner())
                .bind::<SqlUuid, _>(agent_id.into_inner())
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(stale_cutoff)
                .get_result::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn try_claim_assigned(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        let sql = format!(
            "UPDATE leads SET current_agent_id = $2, locked_at = $3, updated_at = $3 \
             WHERE id = $1 AND status = 'pending' AND assigned_to = $2 \
             AND (current_agent_id IS NULL OR locked_at < $4) \
             RETURNING {LEAD_COLUMNS}"
        );
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(id.into_inner())
                .bind::<SqlUuid, _>(agent_id.into_inner())
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(stale_cutoff)
                .get_result::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn try_renew(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        let sql = format!(
            "UPDATE leads SET locked_at = $3, updated_at = $3 \
             WHERE id = $1 AND status = 'pending' \
             AND current_agent_id = $2 AND locked_at >= $4 \
             RETURNING {LEAD_COLUMNS}"
        );
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(id.into_inner())
                .bind::<SqlUuid, _>(agent_id.into_inner())
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(stale_cutoff)
                .get_result::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn release_held(
        &self,
        id: LeadId,
        agent_id: AgentId,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        let sql = format!(
            "UPDATE leads SET current_agent_id = NULL, locked_at = NULL, updated_at = $3 \
             WHERE id = $1 AND current_agent_id = $2 \
             RETURNING {LEAD_COLUMNS}"
        );
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(id.into_inner())
                .bind::<SqlUuid, _>(agent_id.into_inner())
                .bind::<Timestamptz, _>(now)
                .get_result::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Vec<LeadId>> {
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(concat!(
                "UPDATE leads SET current_agent_id = NULL, locked_at = NULL, updated_at = $2 ",
                "WHERE current_agent_id IS NOT NULL AND locked_at < $1 ",
                "RETURNING id",
            ))
            .bind::<Timestamptz, _>(cutoff)
            .bind::<Timestamptz, _>(now)
            .load::<LeadIdRow>(connection)
            .map_err(LeadRepositoryError::persistence)?;
            let mut released: Vec<LeadId> =
                rows.into_iter().map(|row| LeadId::from_uuid(row.id)).collect();
            released.sort();
            Ok(released)
        })
        .await
    }

    async fn try_commit(&self, write: &CommitWrite) -> LeadRepositoryResult<Option<Lead>> {
        let lead_id = write.lead_id.into_inner();
        let agent_id = write.agent_id.into_inner();
        let status = write.outcome.target_status().as_str();
        let notes = write.outcome.notes().to_owned();
        let potential_level = write.outcome.potential_level().as_str();
        let recording_ref = write.outcome.recording_ref().map(str::to_owned);
        let now = write.now;
        let stale_cutoff = write.stale_cutoff;
        let sql = format!(
            "UPDATE leads SET status = $3, notes = $4, potential_level = $5, \
             recording_ref = $6, processed_at = $7, updated_at = $7, \
             current_agent_id = NULL, locked_at = NULL \
             WHERE id = $1 AND status = 'pending' \
             AND current_agent_id = $2 AND locked_at >= $8 \
             RETURNING {LEAD_COLUMNS}"
        );

        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(lead_id)
                .bind::<SqlUuid, _>(agent_id)
                .bind::<Text, _>(status)
                .bind::<Text, _>(notes)
                .bind::<Text, _>(potential_level)
                .bind::<Nullable<Text>, _>(recording_ref)
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(stale_cutoff)
                .get_result::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn pending_assigned_to(&self, agent_id: AgentId) -> LeadRepositoryResult<Vec<LeadId>> {
        self.run_blocking(move |connection| {
            let ids = leads::table
                .filter(leads::status.eq(LeadStatus::Pending.as_str()))
                .filter(leads::assigned_to.eq(agent_id.into_inner()))
                .order((leads::created_at.asc(), leads::id.asc()))
                .select(leads::id)
                .load::<uuid::Uuid>(connection)
                .map_err(LeadRepositoryError::persistence)?;
            Ok(ids.into_iter().map(LeadId::from_uuid).collect())
        })
        .await
    }

    async fn leases_held_by(&self, agent_id: AgentId) -> LeadRepositoryResult<Vec<LeadId>> {
        self.run_blocking(move |connection| {
            let ids = leads::table
                .filter(leads::status.eq(LeadStatus::Pending.as_str()))
                .filter(leads::current_agent_id.eq(agent_id.into_inner()))
                .order((leads::created_at.asc(), leads::id.asc()))
                .select(leads::id)
                .load::<uuid::Uuid>(connection)
                .map_err(LeadRepositoryError::persistence)?;
            Ok(ids.into_iter().map(LeadId::from_uuid).collect())
        })
        .await
    }

    async fn force_release(
        &self,
        id: LeadId,
        assignee: AgentId,
        mode: RevocationMode,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Lead>> {
        let sql = match mode {
            RevocationMode::Unlock => format!(
                "UPDATE leads SET current_agent_id = NULL, locked_at = NULL, updated_at = $3 \
                 WHERE id = $1 AND status = 'pending' AND assigned_to = $2 \
                 AND current_agent_id IS NOT NULL \
                 RETURNING {LEAD_COLUMNS}"
            ),
            RevocationMode::UnassignAndUnlock => format!(
                "UPDATE leads SET assigned_to = NULL, current_agent_id = NULL, \
                 locked_at = NULL, updated_at = $3 \
                 WHERE id = $1 AND status = 'pending' AND assigned_to = $2 \
                 RETURNING {LEAD_COLUMNS}"
            ),
        };
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(id.into_inner())
                .bind::<SqlUuid, _>(assignee.into_inner())
                .bind::<Timestamptz, _>(now)
                .get_result::<LeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn reassign(
        &self,
        id: LeadId,
        target: AgentId,
        now: DateTime<Utc>,
    ) -> LeadRepositoryResult<Option<Reassignment>> {
        let sql = format!(
            "WITH previous AS (SELECT id, assigned_to FROM leads WHERE id = $1 FOR UPDATE) \
             UPDATE leads SET assigned_to = $2, current_agent_id = NULL, locked_at = NULL, \
             updated_at = $3 \
             FROM previous WHERE leads.id = previous.id \
             RETURNING {QUALIFIED_LEAD_COLUMNS}, previous.assigned_to AS previous_assigned_to"
        );
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql)
                .bind::<SqlUuid, _>(id.into_inner())
                .bind::<SqlUuid, _>(target.into_inner())
                .bind::<Timestamptz, _>(now)
                .get_result::<ReassignedLeadRow>(connection)
                .optional()
                .map_err(LeadRepositoryError::persistence)?;
            row.map(|reassigned| {
                Ok(Reassignment {
                    lead: row_to_lead(reassigned.lead)?,
                    previous_assignee: reassigned.previous_assigned_to.map(AgentId::from_uuid),
                })
            })
            .transpose()
        })
        .await
    }
}

fn to_new_row(lead: &Lead) -> NewLeadRow {
    NewLeadRow {
        id: lead.id().into_inner(),
        status: lead.status().as_str().to_owned(),
        assigned_to: lead.assigned_to().map(AgentId::into_inner),
        current_agent_id: lead.current_agent_id().map(AgentId::into_inner),
        locked_at: lead.locked_at(),
        batch_id: lead.batch_id().map(|batch| batch.as_str().to_owned()),
        priority: lead.priority().value(),
        notes: lead.notes().map(str::to_owned),
        potential_level: lead
            .potential_level()
            .map(|level| level.as_str().to_owned()),
        recording_ref: lead.recording_ref().map(str::to_owned),
        created_at: lead.created_at(),
        processed_at: lead.processed_at(),
        updated_at: lead.updated_at(),
    }
}

fn row_to_lead(row: LeadRow) -> LeadRepositoryResult<Lead> {
    let LeadRow {
        id,
        status: persisted_status,
        assigned_to,
        current_agent_id,
        locked_at,
        batch_id: persisted_batch_id,
        priority,
        notes,
        potential_level: persisted_potential_level,
        recording_ref,
        created_at,
        processed_at,
        updated_at,
    } = row;

    let status = LeadStatus::try_from(persisted_status.as_str())
        .map_err(LeadRepositoryError::persistence)?;
    let potential_level = persisted_potential_level
        .as_deref()
        .map(PotentialLevel::try_from)
        .transpose()
        .map_err(LeadRepositoryError::persistence)?;
    let batch_id = persisted_batch_id
        .map(BatchId::new)
        .transpose()
        .map_err(LeadRepositoryError::persistence)?;

    let data = PersistedLeadData {
        id: LeadId::from_uuid(id),
        status,
        assigned_to: assigned_to.map(AgentId::from_uuid),
        current_agent_id: current_agent_id.map(AgentId::from_uuid),
        locked_at,
        batch_id,
        priority: LeadPriority::new(priority),
        notes,
        potential_level,
        recording_ref,
        created_at,
        processed_at,
        updated_at,
    };
    Lead::from_persisted(data).map_err(LeadRepositoryError::persistence)
}
