//! Error types for lead domain validation and parsing.

use super::LeadId;
use thiserror::Error;

/// Errors returned while constructing or mutating domain lead values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LeadDomainError {
    /// The batch identifier is empty or too long.
    #[error("invalid batch identifier '{0}', expected 1-100 characters")]
    InvalidBatchId(String),

    /// A lease was requested on a lead that is not pending.
    #[error("lead {0} is not pending and cannot be leased")]
    NotLeasable(LeadId),

    /// A persisted row carries lease fields that disagree with each other or
    /// with the lead status.
    #[error("lead {0} has inconsistent lease fields")]
    InconsistentLease(LeadId),
}

/// Error returned while parsing lead statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown lead status: {0}")]
pub struct ParseLeadStatusError(pub String);

/// Error returned while parsing potential levels from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown potential level: {0}")]
pub struct ParsePotentialLevelError(pub String);

/// Error returned while parsing activity event types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown activity event type: {0}")]
pub struct ParseActivityEventTypeError(pub String);
