//! Ping processing metrics
//!
//! Counters and the latency histogram are plain atomics updated from the
//! recorder's hot path; `report()` swaps the interval counters out.
//!
//! Relaxed ordering throughout. Values are statistics only and must not
//! drive control flow.

use crate::domain::error::TrackingError;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Upper bounds of the latency buckets, in microseconds; one extra bucket catches the rest
const LATENCY_BOUNDS_US: [u64; 11] =
    [50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 25_000, 50_000, 100_000];
pub const LATENCY_BUCKETS: usize = LATENCY_BOUNDS_US.len() + 1;

/// Maximum number of stores with individual visit counters
pub const MAX_TRACKED_STORES: usize = 32;

/// Interval latency histogram for ping processing
struct LatencyHistogram {
    sum_us: AtomicU64,
    max_us: AtomicU64,
    buckets: [AtomicU64; LATENCY_BUCKETS],
}

/// Histogram contents taken at report time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySnapshot {
    pub count: u64,
    pub sum_us: u64,
    pub max_us: u64,
    pub buckets: [u64; LATENCY_BUCKETS],
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            sum_us: AtomicU64::new(0),
            max_us: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    #[inline]
    fn bucket_for(latency_us: u64) -> usize {
        LATENCY_BOUNDS_US.partition_point(|&bound| bound < latency_us)
    }

    #[inline]
    fn observe(&self, latency_us: u64) {
        self.sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.buckets[Self::bucket_for(latency_us)].fetch_add(1, Ordering::Relaxed);
        self.max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Drain the histogram, leaving it empty for the next interval
    fn take(&self) -> LatencySnapshot {
        let buckets: [u64; LATENCY_BUCKETS] =
            std::array::from_fn(|i| self.buckets[i].swap(0, Ordering::Relaxed));
        LatencySnapshot {
            count: buckets.iter().sum(),
            sum_us: self.sum_us.swap(0, Ordering::Relaxed),
            max_us: self.max_us.swap(0, Ordering::Relaxed),
            buckets,
        }
    }
}

impl LatencySnapshot {
    pub fn avg_us(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.sum_us / self.count
        }
    }

    /// Upper bound of the bucket holding the `q` quantile (0 when empty)
    ///
    /// The overflow bucket reports the observed maximum.
    pub fn quantile_us(&self, q: f64) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let rank = ((self.count as f64 * q).ceil() as u64).max(1);

        let mut seen = 0u64;
        for (i, &n) in self.buckets.iter().enumerate() {
            seen += n;
            if seen >= rank {
                return LATENCY_BOUNDS_US.get(i).copied().unwrap_or(self.max_us);
            }
        }
        self.max_us
    }
}

/// Counters for the ingest pipeline
///
/// Recording never blocks; `report()` drains the interval counters.
pub struct Metrics {
    /// Total pings ever processed (monotonic)
    pings_total: AtomicU64,
    /// Pings since last report (reset on report)
    pings_since_report: AtomicU64,
    /// Per-ping processing time (reset on report)
    latency: LatencyHistogram,
    /// Visits written (monotonic)
    visits_recorded_total: AtomicU64,
    /// Nearby stores skipped because of a recent visit (monotonic)
    duplicates_suppressed_total: AtomicU64,
    /// Pings that wrote nothing (monotonic)
    no_store_in_range_total: AtomicU64,
    /// Pings dated before a nearby store existed (monotonic)
    timestamp_rejected_total: AtomicU64,
    /// Pings received while the catalog was empty (monotonic)
    catalog_empty_total: AtomicU64,
    /// Collaborator failures (monotonic)
    repository_errors_total: AtomicU64,
    /// Feed lines that failed to parse or validate (monotonic)
    invalid_pings_total: AtomicU64,
    /// Visits per store, index determined by order in `set_stores`
    store_visits: [AtomicU64; MAX_TRACKED_STORES],
    /// Store names for per-store counters (set once at init)
    store_names: parking_lot::Mutex<Vec<String>>,
    /// Pre-computed store name to index mapping
    store_name_to_index: parking_lot::RwLock<FxHashMap<String, usize>>,
    /// Start of the current reporting interval
    interval_started: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            pings_total: AtomicU64::new(0),
            pings_since_report: AtomicU64::new(0),
            latency: LatencyHistogram::new(),
            visits_recorded_total: AtomicU64::new(0),
            duplicates_suppressed_total: AtomicU64::new(0),
            no_store_in_range_total: AtomicU64::new(0),
            timestamp_rejected_total: AtomicU64::new(0),
            catalog_empty_total: AtomicU64::new(0),
            repository_errors_total: AtomicU64::new(0),
            invalid_pings_total: AtomicU64::new(0),
            store_visits: std::array::from_fn(|_| AtomicU64::new(0)),
            store_names: parking_lot::Mutex::new(Vec::new()),
            store_name_to_index: parking_lot::RwLock::new(FxHashMap::default()),
            interval_started: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Set the store names that get individual counters (call once at initialization)
    pub fn set_stores<S: AsRef<str>>(&self, names: &[S]) {
        let mut stored = self.store_names.lock();
        stored.clear();
        stored.extend(names.iter().take(MAX_TRACKED_STORES).map(|n| n.as_ref().to_string()));

        let mut index_map = self.store_name_to_index.write();
        index_map.clear();
        for (idx, name) in stored.iter().enumerate() {
            index_map.insert(name.clone(), idx);
        }
    }

    /// Count a processed ping, whatever its outcome
    #[inline]
    pub fn record_ping_processed(&self, latency_us: u64) {
        self.pings_total.fetch_add(1, Ordering::Relaxed);
        self.pings_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency.observe(latency_us);
    }

    /// Record a visit was written for `store_name`
    #[inline]
    pub fn record_visit(&self, store_name: &str) {
        self.visits_recorded_total.fetch_add(1, Ordering::Relaxed);
        let idx = self.store_name_to_index.read().get(store_name).copied();
        if let Some(idx) = idx {
            self.store_visits[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a nearby store that was skipped as a duplicate
    #[inline]
    pub fn record_duplicate(&self) {
        self.duplicates_suppressed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed ping by outcome kind
    pub fn record_rejection(&self, error: &TrackingError) {
        let counter = match error {
            TrackingError::StoreCatalogEmpty => &self.catalog_empty_total,
            TrackingError::TimestampBeforeStoreCreation { .. } => &self.timestamp_rejected_total,
            TrackingError::NoStoreInRange { .. } => &self.no_store_in_range_total,
            TrackingError::Repository(_) => &self.repository_errors_total,
            TrackingError::CourierNotFound(_) | TrackingError::InvalidTimeRange { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a feed line that could not be turned into a ping
    #[inline]
    pub fn record_invalid_ping(&self) {
        self.invalid_pings_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total pings processed
    #[inline]
    pub fn pings_total(&self) -> u64 {
        self.pings_total.load(Ordering::Relaxed)
    }

    /// Get total visits written
    #[inline]
    pub fn visits_recorded_total(&self) -> u64 {
        self.visits_recorded_total.load(Ordering::Relaxed)
    }

    /// Get total duplicates suppressed
    #[inline]
    pub fn duplicates_suppressed_total(&self) -> u64 {
        self.duplicates_suppressed_total.load(Ordering::Relaxed)
    }

    /// Get visit counts for all tracked stores
    pub fn store_visits(&self) -> Vec<(String, u64)> {
        let names = self.store_names.lock();
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), self.store_visits[idx].load(Ordering::Relaxed)))
            .collect()
    }

    /// Snapshot all counters and start a new reporting interval
    pub fn report(&self) -> MetricsSummary {
        let interval_pings = self.pings_since_report.swap(0, Ordering::Relaxed);
        let latency = self.latency.take();

        let elapsed = {
            let mut started = self.interval_started.lock();
            let elapsed = started.elapsed().as_secs_f64();
            *started = Instant::now();
            elapsed
        };
        let pings_per_sec = if elapsed > 0.0 { interval_pings as f64 / elapsed } else { 0.0 };

        MetricsSummary {
            pings_total: self.pings_total.load(Ordering::Relaxed),
            pings_per_sec,
            latency,
            visits_recorded_total: self.visits_recorded_total.load(Ordering::Relaxed),
            duplicates_suppressed_total: self.duplicates_suppressed_total.load(Ordering::Relaxed),
            no_store_in_range_total: self.no_store_in_range_total.load(Ordering::Relaxed),
            timestamp_rejected_total: self.timestamp_rejected_total.load(Ordering::Relaxed),
            catalog_empty_total: self.catalog_empty_total.load(Ordering::Relaxed),
            repository_errors_total: self.repository_errors_total.load(Ordering::Relaxed),
            invalid_pings_total: self.invalid_pings_total.load(Ordering::Relaxed),
            store_visits: self.store_visits(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub pings_total: u64,
    pub pings_per_sec: f64,
    /// Processing latency over the interval
    pub latency: LatencySnapshot,
    pub visits_recorded_total: u64,
    pub duplicates_suppressed_total: u64,
    pub no_store_in_range_total: u64,
    pub timestamp_rejected_total: u64,
    pub catalog_empty_total: u64,
    pub repository_errors_total: u64,
    pub invalid_pings_total: u64,
    pub store_visits: Vec<(String, u64)>,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            pings_total = %self.pings_total,
            pings_per_sec = format!("{:.1}", self.pings_per_sec),
            avg_latency_us = %self.latency.avg_us(),
            max_latency_us = %self.latency.max_us,
            p50_us = %self.latency.quantile_us(0.50),
            p95_us = %self.latency.quantile_us(0.95),
            p99_us = %self.latency.quantile_us(0.99),
            visits = %self.visits_recorded_total,
            duplicates = %self.duplicates_suppressed_total,
            no_store = %self.no_store_in_range_total,
            before_store = %self.timestamp_rejected_total,
            catalog_empty = %self.catalog_empty_total,
            repo_errors = %self.repository_errors_total,
            invalid = %self.invalid_pings_total,
            store_visits = ?self.store_visits,
            "metrics"
        );
    }
}
