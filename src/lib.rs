//! Courier tracking library
//!
//! Matches courier location pings against store locations, records
//! deduplicated store visits and answers travel-history queries.
//! Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
