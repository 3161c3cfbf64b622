//! In-memory adapter implementations.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! tests and single-process deployments without a database.

mod activity;
mod lead;

pub use activity::InMemoryActivityLog;
pub use lead::InMemoryLeadRepository;
