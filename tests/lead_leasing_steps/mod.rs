//! Step definitions for lead leasing behaviour tests.

pub mod given;
pub mod when;
