//! Travel distance over a courier's visit history

use crate::domain::geo::{distance_km, DistanceUnit};
use crate::domain::types::Visit;

/// Sum of great-circle segments between consecutive visits, in kilometers
///
/// `visits` must already be ordered ascending by `observed_at`; no sorting happens here.
pub fn total_distance_km(visits: &[Visit]) -> f64 {
    visits
        .windows(2)
        .map(|pair| distance_km(pair[0].location, pair[1].location))
        .fold(0.0, |total, segment| total + segment)
}

/// Same as [`total_distance_km`], reported in `unit`
pub fn total_distance(visits: &[Visit], unit: DistanceUnit) -> f64 {
    unit.scale_km(total_distance_km(visits))
}
