//! `PostgreSQL` adapters for lead leasing.
//!
//! The expected tables are created by `migrations/2026-01-12-000000_create_leads`.

mod activity;
mod blocking;
mod models;
mod repository;
mod schema;

pub use activity::PostgresActivityLog;
pub use blocking::LeadPgPool;
pub use repository::PostgresLeadRepository;
