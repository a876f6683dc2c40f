//! Courier travel history queries
//!
//! Read-side counterpart of the recorder: lists a courier's visits and
//! aggregates them into a travelled distance.

use crate::domain::error::TrackingError;
use crate::domain::geo::DistanceUnit;
use crate::domain::types::{CourierId, Visit};
use crate::services::distance::total_distance;
use crate::services::repository::VisitRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Query service over recorded visits
pub struct TravelQueries {
    visits: Arc<dyn VisitRepository>,
}

impl TravelQueries {
    pub fn new(visits: Arc<dyn VisitRepository>) -> Self {
        Self { visits }
    }

    /// All visits of a courier, oldest first
    pub fn past_travels(&self, courier_id: &CourierId) -> Result<Vec<Visit>, TrackingError> {
        let visits = self.visits.find_visits_by_courier(courier_id)?;
        if visits.is_empty() {
            return Err(TrackingError::CourierNotFound(courier_id.clone()));
        }
        debug!(courier_id = %courier_id, count = %visits.len(), "past_travels_loaded");
        Ok(visits)
    }

    /// Visits of a courier at one store with `start <= observed_at <= end`, oldest first
    pub fn travels_in_range(
        &self,
        courier_id: &CourierId,
        store_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Visit>, TrackingError> {
        if start > end {
            return Err(TrackingError::InvalidTimeRange { start, end });
        }

        let mut visits = self.visits.find_visits_between(courier_id, store_name, start, end)?;
        if visits.is_empty() {
            return Err(TrackingError::CourierNotFound(courier_id.clone()));
        }
        visits.sort_by_key(|v| v.observed_at);
        Ok(visits)
    }

    /// Total great-circle distance across a courier's visit history
    pub fn total_travel_distance(
        &self,
        courier_id: &CourierId,
        unit: DistanceUnit,
    ) -> Result<f64, TrackingError> {
        let visits = self.past_travels(courier_id)?;
        let total = total_distance(&visits, unit);
        debug!(
            courier_id = %courier_id,
            visits = %visits.len(),
            total = %total,
            unit = %unit.as_str(),
            "travel_distance_computed"
        );
        Ok(total)
    }
}
