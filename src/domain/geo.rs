//! Great-circle distance on a spherical Earth
//!
//! Uses the haversine formula with a mean Earth radius of 6371 km.

use crate::domain::types::GeoPoint;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Unit a distance is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Meters,
    #[default]
    Kilometers,
}

impl DistanceUnit {
    #[inline]
    pub fn scale_km(&self, km: f64) -> f64 {
        match self {
            DistanceUnit::Meters => km * 1000.0,
            DistanceUnit::Kilometers => km,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
        }
    }
}

impl std::str::FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m" | "meters" | "metres" => Ok(DistanceUnit::Meters),
            "km" | "kilometers" | "kilometres" => Ok(DistanceUnit::Kilometers),
            other => Err(format!("unknown distance unit: {}", other)),
        }
    }
}

/// Haversine distance between two points in kilometers
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Haversine distance between two points in the requested unit
pub fn distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    unit.scale_km(distance_km(a, b))
}
