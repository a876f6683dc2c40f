//! Domain models - core business types, errors and geodesy
//!
//! This module contains the canonical data types used throughout the system:
//! - `GeoPoint` - a latitude/longitude pair
//! - `Store` - a store location couriers can visit
//! - `Ping` - a courier's reported location at a point in time
//! - `Visit` - a recorded courier visit to a store
//! - `TrackingError` - distinct non-success outcomes
//! - `geo` - haversine distance

pub mod error;
pub mod geo;
pub mod types;

// Re-export commonly used types at module level
pub use error::{RepositoryError, TrackingError};
pub use geo::{distance, distance_km, DistanceUnit};
pub use types::{CourierId, GeoPoint, Ping, Store, Visit, VisitId};
