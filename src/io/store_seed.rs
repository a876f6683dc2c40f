//! Store seed loading
//!
//! The catalog is bootstrapped from a JSON array:
//! `[{"name": "Ataşehir MMM Migros", "lat": 40.99, "lng": 29.12, "created_at": "2020-01-01T00:00:00Z"}]`
//!
//! `created_at` is optional and defaults to the load time.

use crate::domain::types::{GeoPoint, Store};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read store seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse store seed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate store name in seed: {0}")]
    DuplicateName(String),

    #[error("store '{name}' has invalid coordinates {location}")]
    InvalidLocation { name: String, location: GeoPoint },
}

#[derive(Debug, Deserialize)]
struct StoreRecord {
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Parse seed JSON; stores without `created_at` get `now`
pub fn parse_stores(json: &str, now: DateTime<Utc>) -> Result<Vec<Store>, SeedError> {
    let records: Vec<StoreRecord> = serde_json::from_str(json)?;

    let mut seen = FxHashSet::default();
    let mut stores = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.name.clone()) {
            return Err(SeedError::DuplicateName(record.name));
        }
        let location = GeoPoint::new(record.lat, record.lng);
        if !location.is_valid() {
            return Err(SeedError::InvalidLocation { name: record.name, location });
        }
        stores.push(Store::new(record.name, location, record.created_at.unwrap_or(now)));
    }
    Ok(stores)
}

/// Load stores from a seed file
pub fn load_stores(path: impl AsRef<Path>) -> Result<Vec<Store>, SeedError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let stores = parse_stores(&json, Utc::now())?;
    info!(file = %path.display(), stores = %stores.len(), "store_seed_loaded");
    Ok(stores)
}
