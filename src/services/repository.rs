//! Collaborator interfaces for store and visit persistence
//!
//! The recording engine only reads stores and reads/appends visits.
//! Implementations live in `io/`.

use crate::domain::error::RepositoryError;
use crate::domain::types::{CourierId, Store, Visit};
use chrono::{DateTime, Utc};

/// Read access to the store catalog
pub trait StoreCatalog: Send + Sync {
    fn list_stores(&self) -> Result<Vec<Store>, RepositoryError>;
}

/// Lookup and append access to recorded visits
pub trait VisitRepository: Send + Sync {
    /// Visits for a courier at a store with `from <= observed_at <= to`, in any order
    fn find_visits_between(
        &self,
        courier_id: &CourierId,
        store_name: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Visit>, RepositoryError>;

    /// Persist a visit, assigning an id if it has none
    fn save_visit(&self, visit: Visit) -> Result<Visit, RepositoryError>;

    /// All visits for a courier ordered ascending by `observed_at`
    fn find_visits_by_courier(&self, courier_id: &CourierId) -> Result<Vec<Visit>, RepositoryError>;
}
