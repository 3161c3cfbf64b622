//! Lead leasing and queue distribution.
//!
//! Agents pull leads from their own queue and hold each one under a
//! time-limited lease until they commit an outcome or release it. Leases
//! that outlive their TTL are reclaimed, and managers can revoke or move
//! an agent's work. Every state change is a single conditional write on one
//! row, so any number of sessions may share the store without coordination.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
