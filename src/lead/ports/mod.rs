//! Port contracts for lead leasing.
//!
//! Ports define infrastructure-agnostic interfaces used by lead services.

pub mod activity_log;
pub mod repository;

#[cfg(test)]
pub use activity_log::MockActivityLog;
pub use activity_log::{ActivityLog, ActivityLogError, ActivityLogResult};
pub use repository::{
    CandidateQuery, CommitWrite, LeadRepository, LeadRepositoryError, LeadRepositoryResult,
    Reassignment,
};
