//! Error types for courier tracking
//!
//! Each variant is a distinct, observable outcome of a single operation.
//! None of them leave the engine in a bad state; callers decide how to report them.

use crate::domain::types::CourierId;
use chrono::{DateTime, Utc};

/// Errors raised by the visit store and store catalog collaborators
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Reading or writing the backing file failed
    #[error("repository io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded
    #[error("repository serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcomes of visit recording and travel queries that are not a success
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// No stores are configured at all
    #[error("no stores found in the store catalog")]
    StoreCatalogEmpty,

    /// The ping predates a nearby store's existence; aborts the whole ping
    #[error("timestamp {observed_at} is before store '{store}' was created at {created_at}")]
    TimestampBeforeStoreCreation {
        store: String,
        observed_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },

    /// Nothing was written for the ping
    ///
    /// `nearby` counts stores that were within range but suppressed as duplicates;
    /// zero means the courier is far away from every store.
    #[error("no visit recorded for courier {courier_id}: {}", no_visit_reason(.nearby))]
    NoStoreInRange { courier_id: CourierId, nearby: usize },

    /// No visits are recorded for the courier (or for the queried filter)
    #[error("no travel records found for courier {0}")]
    CourierNotFound(CourierId),

    /// Range query with start after end
    #[error("start time {start} must not be after end time {end}")]
    InvalidTimeRange { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn no_visit_reason(nearby: &usize) -> String {
    match nearby {
        0 => "no store within range".to_string(),
        n => format!("{} stores in range, all visited within the dedup window", n),
    }
}

impl TrackingError {
    /// True if the outcome was caused by the caller's input rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TrackingError::TimestampBeforeStoreCreation { .. }
                | TrackingError::NoStoreInRange { .. }
                | TrackingError::CourierNotFound(_)
                | TrackingError::InvalidTimeRange { .. }
        )
    }

    /// True if ingest cannot continue, as later visits would be lost too
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrackingError::Repository(_))
    }

    /// Short stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingError::StoreCatalogEmpty => "store_catalog_empty",
            TrackingError::TimestampBeforeStoreCreation { .. } => "timestamp_before_store_creation",
            TrackingError::NoStoreInRange { .. } => "no_store_in_range",
            TrackingError::CourierNotFound(_) => "courier_not_found",
            TrackingError::InvalidTimeRange { .. } => "invalid_time_range",
            TrackingError::Repository(_) => "repository",
        }
    }
}
