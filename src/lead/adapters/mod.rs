//! Persistence adapters for lead leasing.
//!
//! - [`memory`]: thread-safe in-memory lease store and activity log
//! - [`postgres`]: `PostgreSQL` lease store and activity log using Diesel,
//!   expressing every lease mutation as one conditional `UPDATE … RETURNING`

pub mod memory;
pub mod postgres;
