//! Append-only activity records describing what happened to a lead.

use super::{AgentId, LeadId, OutcomeAction, ParseActivityEventTypeError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(Uuid);

impl ActivityId {
    /// Creates a new random activity identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an activity identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of event recorded against a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEventType {
    /// An agent received the lead from the queue.
    Viewed,
    /// An agent committed a `contacted` outcome.
    Contacted,
    /// An agent committed an `appointment` outcome.
    Appointment,
    /// A manager cleared the lease held on the lead.
    LeaseRevoked,
    /// A manager returned the lead to the unassigned pool.
    LeadUnassigned,
    /// A manager moved the lead to another agent.
    LeadTransferred,
}

impl ActivityEventType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewed => "viewed",
            Self::Contacted => "contacted",
            Self::Appointment => "appointment",
            Self::LeaseRevoked => "lease_revoked",
            Self::LeadUnassigned => "lead_unassigned",
            Self::LeadTransferred => "lead_transferred",
        }
    }
}

impl fmt::Display for ActivityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OutcomeAction> for ActivityEventType {
    fn from(action: OutcomeAction) -> Self {
        match action {
            OutcomeAction::Contacted => Self::Contacted,
            OutcomeAction::Appointment => Self::Appointment,
        }
    }
}

impl TryFrom<&str> for ActivityEventType {
    type Error = ParseActivityEventTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "viewed" => Ok(Self::Viewed),
            "contacted" => Ok(Self::Contacted),
            "appointment" => Ok(Self::Appointment),
            "lease_revoked" => Ok(Self::LeaseRevoked),
            "lead_unassigned" => Ok(Self::LeadUnassigned),
            "lead_transferred" => Ok(Self::LeadTransferred),
            _ => Err(ParseActivityEventTypeError(value.to_owned())),
        }
    }
}

/// Immutable audit entry. Records are appended and never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    id: ActivityId,
    lead_id: LeadId,
    agent_id: AgentId,
    event_type: ActivityEventType,
    metadata: Value,
    recorded_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// Creates a record stamped with the current clock time.
    #[must_use]
    pub fn new(
        lead_id: LeadId,
        agent_id: AgentId,
        event_type: ActivityEventType,
        metadata: Value,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            lead_id,
            agent_id,
            event_type,
            metadata,
            recorded_at: clock.utc(),
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: ActivityId,
        lead_id: LeadId,
        agent_id: AgentId,
        event_type: ActivityEventType,
        metadata: Value,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            lead_id,
            agent_id,
            event_type,
            metadata,
            recorded_at,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> ActivityId {
        self.id
    }

    /// Returns the lead the event concerns.
    #[must_use]
    pub const fn lead_id(&self) -> LeadId {
        self.lead_id
    }

    /// Returns the agent the event concerns.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn event_type(&self) -> ActivityEventType {
        self.event_type
    }

    /// Returns event-specific metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Returns when the event was recorded.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
