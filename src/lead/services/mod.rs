//! Application services for lead leasing.

mod commit;
mod desk;
mod lease;
mod puller;
mod reaper;
mod revocation;
mod transfer;

pub use commit::{CommitError, CommitProcessor, CommitResult};
pub use desk::LeadDesk;
pub use lease::{LeaseError, LeaseManager, LeaseResult};
pub use puller::{PullError, PullOutcome, PullResult, QueuePuller, ResumeOutcome};
pub use reaper::{MIN_SWEEP_INTERVAL, StaleLeaseReaper, SweepLoopSummary, SweepReport};
pub use revocation::{RevocationError, RevocationReport, RevocationService};
pub use transfer::{TransferError, TransferResult, TransferService};
