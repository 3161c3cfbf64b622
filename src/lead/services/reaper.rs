//! Reclaiming leases whose holders went silent.

use crate::lead::{
    domain::{LeadId, LeasePolicy},
    ports::{LeadRepository, LeadRepositoryResult},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shortest period accepted by [`StaleLeaseReaper::run_every`].
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Leads released by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Leads whose lease was cleared by this sweep.
    pub released: Vec<LeadId>,
}

impl SweepReport {
    /// Returns how many leases were cleared.
    #[must_use]
    pub fn count(&self) -> usize {
        self.released.len()
    }
}

/// Totals accumulated by [`StaleLeaseReaper::run_every`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepLoopSummary {
    /// Sweeps that completed.
    pub sweeps: u64,
    /// Sweeps that failed.
    pub failures: u64,
    /// Leases cleared across all sweeps.
    pub released: u64,
}

/// Maintenance sweep that clears stale leases regardless of holder.
///
/// Every clear is conditioned on the row still being stale when written, so
/// any number of reapers may run concurrently.
#[derive(Clone)]
pub struct StaleLeaseReaper<R, C>
where
    R: LeadRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    policy: LeasePolicy,
}

impl<R, C> StaleLeaseReaper<R, C>
where
    R: LeadRepository,
    C: Clock + Send + Sync,
{
    /// Creates a reaper.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>, policy: LeasePolicy) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// Clears every lease older than the lease TTL.
    ///
    /// # Errors
    ///
    /// Returns the repository error when the store fails.
    pub async fn sweep(&self) -> LeadRepositoryResult<SweepReport> {
        let now = self.clock.utc();
        self.release_older_than(self.policy.stale_cutoff(now), now, "stale")
            .await
    }

    /// Clears every lease older than the stuck threshold.
    ///
    /// This is the administrative sweep a manager triggers for leads that
    /// have been sitting locked for hours; it uses its own threshold and is
    /// independent of the routine TTL.
    ///
    /// # Errors
    ///
    /// Returns the repository error when the store fails.
    pub async fn sweep_stuck(&self) -> LeadRepositoryResult<SweepReport> {
        let now = self.clock.utc();
        self.release_older_than(self.policy.stuck_cutoff(now), now, "stuck")
            .await
    }

    /// Sweeps on a fixed period until `shutdown` resolves.
    ///
    /// Failed sweeps are logged and the loop carries on. Periods shorter
    /// than [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub async fn run_every<F>(&self, period: Duration, shutdown: F) -> SweepLoopSummary
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period.max(MIN_SWEEP_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop = std::pin::pin!(shutdown);
        let mut summary = SweepLoopSummary::default();

        loop {
            tokio::select! {
                () = &mut stop => break,
                _ = ticker.tick() => match self.sweep().await {
                    Ok(report) => {
                        summary.sweeps += 1;
                        summary.released += u64::try_from(report.count()).unwrap_or(u64::MAX);
                    }
                    Err(err) => {
                        summary.failures += 1;
                        warn!(error = %err, "periodic lease sweep failed");
                    }
                },
            }
        }

        info!(
            sweeps = summary.sweeps,
            failures = summary.failures,
            released = summary.released,
            "lease sweep loop stopped"
        );
        summary
    }

    async fn release_older_than(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        kind: &'static str,
    ) -> LeadRepositoryResult<SweepReport> {
        let released = self.repository.release_stale(cutoff, now).await?;
        if released.is_empty() {
            debug!(kind, %cutoff, "lease sweep found nothing to release");
        } else {
            info!(kind, %cutoff, released = released.len(), "lease sweep released leases");
        }
        Ok(SweepReport { released })
    }
}
