//! Clears stale lead leases in `PostgreSQL` on a fixed interval.
//!
//! Usage:
//!
//! ```text
//! lease_reaper [run | once | stuck]
//! ```
//!
//! `run` (the default) sweeps every `REAP_INTERVAL_SECS` until interrupted.
//! `once` performs a single TTL sweep and `stuck` a single stuck-lease
//! sweep, then exit. Configuration comes from the environment:
//!
//! | Variable               | Default | Meaning                                  |
//! |------------------------|---------|------------------------------------------|
//! | `DATABASE_URL`         | none    | `PostgreSQL` connection string           |
//! | `LEASE_TTL_SECS`       | 1800    | Age after which a lease is stale         |
//! | `STUCK_THRESHOLD_SECS` | 14400   | Age after which a lease counts as stuck  |
//! | `REAP_INTERVAL_SECS`   | 60      | Period between sweeps in `run` mode      |
//!
//! Log output is controlled with `RUST_LOG`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use leadlease::lead::{
    adapters::postgres::PostgresLeadRepository,
    domain::{LeasePolicy, LeasePolicyError},
    ports::LeadRepositoryError,
    services::StaleLeaseReaper,
};
use mockable::DefaultClock;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LEASE_TTL_SECS: u64 = 30 * 60;
const DEFAULT_STUCK_THRESHOLD_SECS: u64 = 4 * 60 * 60;
const DEFAULT_REAP_INTERVAL_SECS: u64 = 60;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the daemon.
#[derive(Debug, Error)]
enum ReaperDaemonError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidSeconds { name: &'static str, value: String },
    #[error("invalid lease policy: {0}")]
    Policy(#[from] LeasePolicyError),
    #[error("failed to build connection pool: {0}")]
    Pool(#[source] PoolError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("sweep failed: {0}")]
    Sweep(#[from] LeadRepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Once,
    Stuck,
}

impl Mode {
    fn parse(arg: Option<&str>) -> Result<Self, ReaperDaemonError> {
        match arg {
            None | Some("run") => Ok(Self::Run),
            Some("once") => Ok(Self::Once),
            Some("stuck") => Ok(Self::Stuck),
            Some(other) => Err(ReaperDaemonError::InvalidArgs(format!(
                "unknown mode '{other}'; expected run, once, or stuck"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReaperConfig {
    database_url: String,
    policy: LeasePolicy,
    interval: Duration,
}

impl ReaperConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, ReaperDaemonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ReaperDaemonError::MissingVar("DATABASE_URL"))?;
        let lease_ttl = seconds(&lookup, "LEASE_TTL_SECS", DEFAULT_LEASE_TTL_SECS)?;
        let stuck_threshold = seconds(
            &lookup,
            "STUCK_THRESHOLD_SECS",
            DEFAULT_STUCK_THRESHOLD_SECS,
        )?;
        let interval = seconds(&lookup, "REAP_INTERVAL_SECS", DEFAULT_REAP_INTERVAL_SECS)?;

        let policy = LeasePolicy::default()
            .with_lease_ttl(to_time_delta("LEASE_TTL_SECS", lease_ttl)?)
            .with_stuck_threshold(to_time_delta("STUCK_THRESHOLD_SECS", stuck_threshold)?)
            .validate()?;

        Ok(Self {
            database_url,
            policy,
            interval: Duration::from_secs(interval),
        })
    }
}

fn seconds<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ReaperDaemonError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or(ReaperDaemonError::InvalidSeconds { name, value: raw })
}

fn to_time_delta(name: &'static str, secs: u64) -> Result<TimeDelta, ReaperDaemonError> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| ReaperDaemonError::InvalidSeconds {
            name,
            value: secs.to_string(),
        })
}

fn main() -> Result<(), BoxError> {
    init_tracing();
    let arg = env::args().nth(1);
    let mode = Mode::parse(arg.as_deref())?;
    let config = ReaperConfig::from_lookup(|key| env::var(key).ok())?;
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ReaperDaemonError::RuntimeInit)?;
    runtime.block_on(run(mode, config)).map_err(Into::into)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(mode: Mode, config: ReaperConfig) -> Result<(), ReaperDaemonError> {
    let pool = Pool::builder()
        .build(ConnectionManager::<PgConnection>::new(&config.database_url))
        .map_err(ReaperDaemonError::Pool)?;
    let reaper = StaleLeaseReaper::new(
        Arc::new(PostgresLeadRepository::new(pool)),
        Arc::new(DefaultClock),
        config.policy,
    );

    match mode {
        Mode::Run => {
            info!(
                interval_secs = config.interval.as_secs(),
                lease_ttl = %config.policy.lease_ttl,
                "lease reaper started"
            );
            reaper.run_every(config.interval, shutdown_signal()).await;
        }
        Mode::Once => {
            let report = reaper.sweep().await?;
            info!(released = report.count(), "single sweep finished");
        }
        Mode::Stuck => {
            let report = reaper.sweep_stuck().await?;
            info!(released = report.count(), "stuck lease sweep finished");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
