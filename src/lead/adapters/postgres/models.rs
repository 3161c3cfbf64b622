//! Diesel row models for lead persistence.

use super::schema::{lead_activity, leads};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for lead records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = leads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LeadRow {
    /// Lead identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub id: uuid::Uuid,
    /// Lifecycle status.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub status: String,
    /// Owning agent.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Uuid>)]
    pub assigned_to: Option<uuid::Uuid>,
    /// Agent holding the active lease.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Uuid>)]
    pub current_agent_id: Option<uuid::Uuid>,
    /// When the active lease was acquired.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    pub locked_at: Option<DateTime<Utc>>,
    /// Originating upload batch.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Varchar>)]
    pub batch_id: Option<String>,
    /// Queue priority.
    #[diesel(sql_type = diesel::sql_types::Int2)]
    pub priority: i16,
    /// Annotation stored by the last commit.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub notes: Option<String>,
    /// Potential classification stored by the last commit.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Varchar>)]
    pub potential_level: Option<String>,
    /// Call recording reference stored by the last commit.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub recording_ref: Option<String>,
    /// Creation timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
    /// When the lead left the pending pool.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    pub processed_at: Option<DateTime<Utc>>,
    /// Last mutation timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub updated_at: DateTime<Utc>,
}

/// Lead row returned by a reassignment, with the owner it replaced.
#[derive(Debug, Clone, QueryableByName)]
pub struct ReassignedLeadRow {
    /// Lead state after the write.
    #[diesel(embed)]
    pub lead: LeadRow,
    /// Owner before the write.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Uuid>)]
    pub previous_assigned_to: Option<uuid::Uuid>,
}

/// Identifier-only row returned by bulk lease releases.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct LeadIdRow {
    /// Lead identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub id: uuid::Uuid,
}

/// Insert model for lead records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = leads)]
pub struct NewLeadRow {
    /// Lead identifier.
    pub id: uuid::Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Owning agent.
    pub assigned_to: Option<uuid::Uuid>,
    /// Agent holding the active lease.
    pub current_agent_id: Option<uuid::Uuid>,
    /// When the active lease was acquired.
    pub locked_at: Option<DateTime<Utc>>,
    /// Originating upload batch.
    pub batch_id: Option<String>,
    /// Queue priority.
    pub priority: i16,
    /// Annotation stored by the last commit.
    pub notes: Option<String>,
    /// Potential classification stored by the last commit.
    pub potential_level: Option<String>,
    /// Call recording reference stored by the last commit.
    pub recording_ref: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the lead left the pending pool.
    pub processed_at: Option<DateTime<Utc>>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for activity records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lead_activity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityRow {
    /// Record identifier.
    pub id: uuid::Uuid,
    /// Lead the event concerns.
    pub lead_id: uuid::Uuid,
    /// Agent the event concerns.
    pub agent_id: uuid::Uuid,
    /// Event kind.
    pub event_type: String,
    /// Event-specific metadata.
    pub metadata: Value,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Insert model for activity records. `seq` is assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lead_activity)]
pub struct NewActivityRow {
    /// Record identifier.
    pub id: uuid::Uuid,
    /// Lead the event concerns.
    pub lead_id: uuid::Uuid,
    /// Agent the event concerns.
    pub agent_id: uuid::Uuid,
    /// Event kind.
    pub event_type: String,
    /// Event-specific metadata.
    pub metadata: Value,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}
