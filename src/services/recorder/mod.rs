//! Visit recording - turns courier pings into store visits
//!
//! The VisitRecorder is the central ping processor that coordinates:
//! - Store matching (every store in the catalog is classified)
//! - Store validity (a ping may not predate a nearby store)
//! - De-duplication (one visit per courier/store per window)
//! - Persistence (qualifying visits are handed to the visit repository)
//!
//! Processing is two-phase: all nearby stores are validated before any visit
//! is written, so a rejected ping never leaves partial writes behind.

#[cfg(test)]
mod tests;

use crate::domain::error::TrackingError;
use crate::domain::types::{Ping, Store, Visit};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::deduper::VisitDeduper;
use crate::services::proximity::ProximityClassifier;
use crate::services::repository::{StoreCatalog, VisitRepository};
use chrono::Duration;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Visits written for a single ping (usually one, more when store radii overlap)
pub type RecordedVisits = SmallVec<[Visit; 2]>;

/// Central ping processor for store visit detection
pub struct VisitRecorder {
    /// Source of known stores
    catalog: Arc<dyn StoreCatalog>,
    /// Visit lookup and persistence
    visits: Arc<dyn VisitRepository>,
    /// Radius check
    classifier: ProximityClassifier,
    /// Repeat-ping suppression
    deduper: VisitDeduper,
    /// Metrics collector
    metrics: Arc<Metrics>,
}

impl VisitRecorder {
    /// Create a recorder with default radius and window
    pub fn new(
        catalog: Arc<dyn StoreCatalog>,
        visits: Arc<dyn VisitRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            visits,
            classifier: ProximityClassifier::default(),
            deduper: VisitDeduper::default(),
            metrics,
        }
    }

    /// Create a recorder using the matching settings from `config`
    pub fn from_config(
        config: &Config,
        catalog: Arc<dyn StoreCatalog>,
        visits: Arc<dyn VisitRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let secs = config.dedup_window_secs();
        let window = Duration::try_seconds(secs).unwrap_or_else(|| {
            warn!(dedup_window_secs = %secs, "dedup_window_out_of_range");
            Duration::MAX
        });
        Self::new(catalog, visits, metrics)
            .with_radius_m(config.radius_m())
            .with_dedup_window(window)
    }

    pub fn with_radius_m(mut self, radius_m: f64) -> Self {
        self.classifier = ProximityClassifier::new(radius_m);
        self
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.deduper = VisitDeduper::new(window);
        self
    }

    pub fn classifier(&self) -> &ProximityClassifier {
        &self.classifier
    }

    pub fn deduper(&self) -> &VisitDeduper {
        &self.deduper
    }

    /// Process a single ping, writing a visit for every qualifying nearby store
    pub fn record_ping(&self, ping: &Ping) -> Result<RecordedVisits, TrackingError> {
        let process_start = Instant::now();

        let result = self.process_ping(ping);
        if let Err(ref e) = result {
            self.metrics.record_rejection(e);
            if e.is_client_error() {
                debug!(courier_id = %ping.courier_id, outcome = %e.kind(), error = %e, "ping_rejected");
            } else {
                warn!(courier_id = %ping.courier_id, outcome = %e.kind(), error = %e, "ping_failed");
            }
        }

        let latency_us = process_start.elapsed().as_micros() as u64;
        self.metrics.record_ping_processed(latency_us);

        result
    }

    fn process_ping(&self, ping: &Ping) -> Result<RecordedVisits, TrackingError> {
        let stores = self.catalog.list_stores()?;
        if stores.is_empty() {
            return Err(TrackingError::StoreCatalogEmpty);
        }

        let nearby = self.nearby_stores(ping, &stores)?;

        let mut recorded = RecordedVisits::new();
        for store in &nearby {
            if let Some(visit) = self.record_at_store(ping, store)? {
                recorded.push(visit);
            }
        }

        if recorded.is_empty() {
            return Err(TrackingError::NoStoreInRange {
                courier_id: ping.courier_id.clone(),
                nearby: nearby.len(),
            });
        }

        Ok(recorded)
    }

    /// Phase 1: stores within radius, failing if the ping predates any of them
    fn nearby_stores<'a>(
        &self,
        ping: &Ping,
        stores: &'a [Store],
    ) -> Result<SmallVec<[&'a Store; 4]>, TrackingError> {
        let mut nearby = SmallVec::new();

        for store in stores {
            if !self.classifier.is_within(ping.location, store.location) {
                continue;
            }

            if ping.observed_at < store.created_at {
                return Err(TrackingError::TimestampBeforeStoreCreation {
                    store: store.name.clone(),
                    observed_at: ping.observed_at,
                    created_at: store.created_at,
                });
            }

            nearby.push(store);
        }

        Ok(nearby)
    }

    /// Phase 2: de-duplicate against the look-back window and persist
    fn record_at_store(&self, ping: &Ping, store: &Store) -> Result<Option<Visit>, TrackingError> {
        let window_start = self.deduper.window_start(ping.observed_at);
        let candidates = self.visits.find_visits_between(
            &ping.courier_id,
            &store.name,
            window_start,
            ping.observed_at,
        )?;
        let last = VisitDeduper::select_last(candidates);

        if !self.deduper.should_record(last.as_ref(), ping.observed_at) {
            self.metrics.record_duplicate();
            debug!(
                courier_id = %ping.courier_id,
                store = %store.name,
                "ping_duplicate"
            );
            return Ok(None);
        }

        let saved = self.visits.save_visit(Visit::from_ping(ping, &store.name))?;
        self.metrics.record_visit(&store.name);

        info!(
            courier_id = %saved.courier_id,
            store = %saved.store_name,
            visit_id = ?saved.id,
            observed_at = %saved.observed_at,
            "visit_recorded"
        );

        Ok(Some(saved))
    }
}
