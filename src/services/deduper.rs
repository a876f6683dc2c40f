//! Visit de-duplication
//!
//! A courier lingering near a store keeps pinging; only the first ping in a
//! window becomes a visit. Matches on:
//! - Pair: same courier and store name (enforced by the lookup)
//! - Time: most recent visit within the window ending at the ping time

use crate::domain::types::Visit;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Default de-duplication window in seconds
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Largest window accepted from configuration (one week)
pub const MAX_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Decides whether a ping should produce a new visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitDeduper {
    window: Duration,
}

impl VisitDeduper {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the look-back window for a ping at `ping_time`
    ///
    /// Saturates at the earliest representable instant.
    #[inline]
    pub fn window_start(&self, ping_time: DateTime<Utc>) -> DateTime<Utc> {
        ping_time.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Pick the visit with the latest `observed_at` from a lookup result
    pub fn select_last(visits: Vec<Visit>) -> Option<Visit> {
        visits.into_iter().max_by_key(|v| v.observed_at)
    }

    /// Record unless the last matching visit is at most one window old
    pub fn should_record(&self, last_matching_visit: Option<&Visit>, ping_time: DateTime<Utc>) -> bool {
        let Some(last) = last_matching_visit else {
            return true;
        };

        let elapsed = ping_time - last.observed_at;
        let record = elapsed > self.window;
        if !record {
            debug!(
                courier_id = %last.courier_id,
                store = %last.store_name,
                elapsed_ms = %elapsed.num_milliseconds(),
                "ping_within_dedup_window"
            );
        }
        record
    }
}

impl Default for VisitDeduper {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}
