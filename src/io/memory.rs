//! In-memory store catalog and visit store
//!
//! Visits are kept per courier, sorted by `observed_at`, behind a
//! `parking_lot::RwLock`. Reads see every completed write (read-after-write),
//! but nothing here serializes a read-decide-write sequence across callers.

use crate::domain::error::RepositoryError;
use crate::domain::types::{CourierId, Store, Visit, VisitId};
use crate::services::repository::{StoreCatalog, VisitRepository};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Fixed set of stores handed in at bootstrap
#[derive(Debug, Clone, Default)]
pub struct StaticStoreCatalog {
    stores: Vec<Store>,
}

impl StaticStoreCatalog {
    pub fn new(stores: Vec<Store>) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl StoreCatalog for StaticStoreCatalog {
    fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        Ok(self.stores.clone())
    }
}

/// Visit store keyed by courier
#[derive(Debug, Default)]
pub struct InMemoryVisitStore {
    by_courier: RwLock<FxHashMap<CourierId, Vec<Visit>>>,
}

impl InMemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-persisted visit (keeps its id; assigns one if missing)
    pub(crate) fn insert(&self, mut visit: Visit) -> Visit {
        if visit.id.is_none() {
            visit.id = Some(VisitId::generate());
        }

        let mut by_courier = self.by_courier.write();
        let history = by_courier.entry(visit.courier_id.clone()).or_default();
        // Insert after any visit with the same timestamp to keep arrival order stable
        let pos = history.partition_point(|v| v.observed_at <= visit.observed_at);
        history.insert(pos, visit.clone());
        visit
    }

    /// Total visits across all couriers
    pub fn len(&self) -> usize {
        self.by_courier.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of couriers with at least one visit
    pub fn courier_count(&self) -> usize {
        self.by_courier.read().len()
    }
}

impl VisitRepository for InMemoryVisitStore {
    fn find_visits_between(
        &self,
        courier_id: &CourierId,
        store_name: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Visit>, RepositoryError> {
        let by_courier = self.by_courier.read();
        let Some(history) = by_courier.get(courier_id) else {
            return Ok(Vec::new());
        };

        let start = history.partition_point(|v| v.observed_at < from);
        Ok(history[start..]
            .iter()
            .take_while(|v| v.observed_at <= to)
            .filter(|v| v.store_name == store_name)
            .cloned()
            .collect())
    }

    fn save_visit(&self, visit: Visit) -> Result<Visit, RepositoryError> {
        Ok(self.insert(visit))
    }

    fn find_visits_by_courier(&self, courier_id: &CourierId) -> Result<Vec<Visit>, RepositoryError> {
        Ok(self.by_courier.read().get(courier_id).cloned().unwrap_or_default())
    }
}
