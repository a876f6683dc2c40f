//! Proximity classification between a courier and a store

use crate::domain::geo::distance_km;
use crate::domain::types::GeoPoint;

/// Default radius for matching a courier to a store (100 meters)
pub const DEFAULT_RADIUS_M: f64 = 100.0;

/// True if `courier` is within `radius_m` meters of `store` (boundary inclusive)
#[inline]
pub fn is_within(courier: GeoPoint, store: GeoPoint, radius_m: f64) -> bool {
    distance_km(courier, store) <= radius_m / 1000.0
}

/// Classifies pings against stores using a fixed radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityClassifier {
    radius_m: f64,
}

impl ProximityClassifier {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    #[inline]
    pub fn is_within(&self, courier: GeoPoint, store: GeoPoint) -> bool {
        is_within(courier, store, self.radius_m)
    }
}

impl Default for ProximityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_M)
    }
}
