//! Diesel schema for lead leasing persistence.

diesel::table! {
    /// Lead records, including ownership and the active lease.
    leads (id) {
        /// Lead identifier.
        id -> Uuid,
        /// Lifecycle status.
        #[max_length = 32]
        status -> Varchar,
        /// Owning agent.
        assigned_to -> Nullable<Uuid>,
        /// Agent holding the active lease.
        current_agent_id -> Nullable<Uuid>,
        /// When the active lease was acquired.
        locked_at -> Nullable<Timestamptz>,
        /// Originating upload batch.
        #[max_length = 100]
        batch_id -> Nullable<Varchar>,
        /// Queue priority.
        priority -> Int2,
        /// Annotation stored by the last commit.
        notes -> Nullable<Text>,
        /// Potential classification stored by the last commit.
        #[max_length = 16]
        potential_level -> Nullable<Varchar>,
        /// Call recording reference stored by the last commit.
        recording_ref -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// When the lead left the pending pool.
        processed_at -> Nullable<Timestamptz>,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only lead activity trail.
    lead_activity (id) {
        /// Record identifier.
        id -> Uuid,
        /// Monotonic append position.
        seq -> Int8,
        /// Lead the event concerns.
        lead_id -> Uuid,
        /// Agent the event concerns.
        agent_id -> Uuid,
        /// Event kind.
        #[max_length = 32]
        event_type -> Varchar,
        /// Event-specific metadata.
        metadata -> Jsonb,
        /// When the event was recorded.
        recorded_at -> Timestamptz,
    }
}
