//! Services - business logic
//!
//! This module contains the core business logic services:
//! - `recorder` - Central ping processor (store matching, validation, persistence)
//! - `proximity` - Radius check between a courier and a store
//! - `deduper` - Suppresses repeat pings within the visit window
//! - `distance` - Travel distance over a visit history
//! - `travels` - Courier travel history queries
//! - `repository` - Store catalog and visit persistence interfaces

pub mod deduper;
pub mod distance;
pub mod proximity;
pub mod recorder;
pub mod repository;
pub mod travels;

// Re-export commonly used types
pub use deduper::VisitDeduper;
pub use proximity::ProximityClassifier;
pub use recorder::{RecordedVisits, VisitRecorder};
pub use repository::{StoreCatalog, VisitRepository};
pub use travels::TravelQueries;
