//! Leadlease: lead leasing and queue distribution for calling teams.
//!
//! Leads are distributed to agents in batches. Each agent works their queue
//! one lead at a time, holding a short lease that keeps concurrent sessions
//! from working the same lead twice.
//!
//! # Architecture
//!
//! Leadlease follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the lease store and audit log
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`lead`]: Leasing, queue pulls, commits, and manager overrides

pub mod lead;
