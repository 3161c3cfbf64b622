//! Caller-supplied leasing policy.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

/// Longest lease TTL or stuck threshold a policy accepts.
pub const MAX_LEASE_WINDOW: TimeDelta = TimeDelta::days(365);

/// Order in which the queue offers an agent's claimable leads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueueOrder {
    /// Oldest `created_at` first. Strict FIFO per agent.
    #[default]
    OldestFirst,
    /// Highest priority first, oldest first within a priority.
    Priority,
}

/// Tunables for leasing, reclaiming, and committing leads.
///
/// `lease_ttl` governs routine reclaim by claimants and the per-pull sweep.
/// `stuck_threshold` is a separate, longer policy used only by
/// manager-triggered sweeps; the two are never derived from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    /// Age after which a lease is stale and may be taken by any claimant.
    pub lease_ttl: TimeDelta,
    /// Age after which a manager sweep treats a lease as stuck.
    pub stuck_threshold: TimeDelta,
    /// Candidate ordering for the queue puller.
    pub queue_order: QueueOrder,
    /// How many candidates the puller fetches per selection round.
    pub candidate_batch_size: usize,
    /// Minimum trimmed note length, in characters, for a commit.
    pub min_note_chars: usize,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self {
            lease_ttl: TimeDelta::minutes(30),
            stuck_threshold: TimeDelta::hours(4),
            queue_order: QueueOrder::OldestFirst,
            candidate_batch_size: 16,
            min_note_chars: 10,
        }
    }
}

impl LeasePolicy {
    /// Sets the lease time-to-live.
    #[must_use]
    pub const fn with_lease_ttl(mut self, lease_ttl: TimeDelta) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    /// Sets the stuck-lease threshold for manager sweeps.
    #[must_use]
    pub const fn with_stuck_threshold(mut self, stuck_threshold: TimeDelta) -> Self {
        self.stuck_threshold = stuck_threshold;
        self
    }

    /// Sets the candidate ordering.
    #[must_use]
    pub const fn with_queue_order(mut self, queue_order: QueueOrder) -> Self {
        self.queue_order = queue_order;
        self
    }

    /// Sets the candidate batch size.
    #[must_use]
    pub const fn with_candidate_batch_size(mut self, candidate_batch_size: usize) -> Self {
        self.candidate_batch_size = candidate_batch_size;
        self
    }

    /// Sets the minimum note length.
    #[must_use]
    pub const fn with_min_note_chars(mut self, min_note_chars: usize) -> Self {
        self.min_note_chars = min_note_chars;
        self
    }

    /// Checks the policy for values no deployment could mean.
    ///
    /// # Errors
    ///
    /// Returns [`LeasePolicyError`] when the TTL is not positive, either
    /// window exceeds [`MAX_LEASE_WINDOW`], the stuck threshold is shorter
    /// than the TTL, or the batch size is zero.
    pub fn validate(self) -> Result<Self, LeasePolicyError> {
        if self.lease_ttl <= TimeDelta::zero() {
            return Err(LeasePolicyError::NonPositiveLeaseTtl(self.lease_ttl));
        }
        if self.lease_ttl > MAX_LEASE_WINDOW {
            return Err(LeasePolicyError::WindowTooLong {
                name: "lease ttl",
                window: self.lease_ttl,
            });
        }
        if self.stuck_threshold > MAX_LEASE_WINDOW {
            return Err(LeasePolicyError::WindowTooLong {
                name: "stuck threshold",
                window: self.stuck_threshold,
            });
        }
        if self.stuck_threshold < self.lease_ttl {
            return Err(LeasePolicyError::StuckThresholdBelowTtl {
                stuck_threshold: self.stuck_threshold,
                lease_ttl: self.lease_ttl,
            });
        }
        if self.candidate_batch_size == 0 {
            return Err(LeasePolicyError::EmptyCandidateBatch);
        }
        Ok(self)
    }

    /// Returns the instant before which a lease taken is stale at `now`.
    ///
    /// Saturates at the earliest representable instant, so an unvalidated
    /// oversized TTL means no lease is ever stale.
    #[must_use]
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(now, self.lease_ttl)
    }

    /// Returns the instant before which a lease taken counts as stuck.
    #[must_use]
    pub fn stuck_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(now, self.stuck_threshold)
    }
}

fn cutoff(now: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Invalid leasing policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LeasePolicyError {
    /// The lease TTL is zero or negative.
    #[error("lease ttl must be positive, got {0}")]
    NonPositiveLeaseTtl(TimeDelta),

    /// The stuck threshold would reclaim leases that are still fresh.
    #[error("stuck threshold {stuck_threshold} is shorter than lease ttl {lease_ttl}")]
    StuckThresholdBelowTtl {
        /// Configured stuck threshold.
        stuck_threshold: TimeDelta,
        /// Configured lease TTL.
        lease_ttl: TimeDelta,
    },

    /// A lease window is longer than [`MAX_LEASE_WINDOW`].
    #[error("{name} {window} exceeds the maximum of {max}", max = MAX_LEASE_WINDOW)]
    WindowTooLong {
        /// Which window was rejected.
        name: &'static str,
        /// Configured length.
        window: TimeDelta,
    },

    /// The puller would never fetch a candidate.
    #[error("candidate batch size must be at least 1")]
    EmptyCandidateBatch,
}
