//! Domain model for lead leasing.
//!
//! The lead domain models ownership (`assigned_to`), short-term possession
//! (the [`Lease`]), lifecycle status, agent outcomes, and the audit trail,
//! while keeping all storage concerns outside the domain boundary.

mod activity;
mod error;
mod ids;
mod lead;
mod outcome;
mod policy;
mod revocation;
mod status;

pub use activity::{ActivityEventType, ActivityId, ActivityRecord};
pub use error::{
    LeadDomainError, ParseActivityEventTypeError, ParseLeadStatusError, ParsePotentialLevelError,
};
pub use ids::{AgentId, BatchId, LeadId, LeadPriority};
pub use lead::{Lead, Lease, PersistedLeadData};
pub use outcome::{CommitOutcome, CommitValidationError, OutcomeAction, ValidatedOutcome};
pub use policy::{LeasePolicy, LeasePolicyError, MAX_LEASE_WINDOW, QueueOrder};
pub use revocation::RevocationMode;
pub use status::{LeadStatus, PotentialLevel};
