//! Shared types for courier tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype wrapper for courier IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourierId(pub String);

impl CourierId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CourierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for visit IDs (UUIDv7, time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct VisitId(pub Uuid);

impl VisitId {
    /// Generate a new UUIDv7
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for VisitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True if both coordinates are inside their valid degree ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A store location couriers can visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    /// Unique key used to match visits against stores
    pub name: String,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn new(name: impl Into<String>, location: GeoPoint, created_at: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), location, created_at }
    }
}

/// A single geolocation report from a courier
#[derive(Debug, Clone, PartialEq)]
pub struct Ping {
    pub courier_id: CourierId,
    pub location: GeoPoint,
    pub observed_at: DateTime<Utc>,
}

impl Ping {
    pub fn new(courier_id: CourierId, location: GeoPoint, observed_at: DateTime<Utc>) -> Self {
        Self { courier_id, location, observed_at }
    }
}

/// A recorded visit of a courier to a store
///
/// `id` is `None` until the visit has been persisted; the repository assigns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<VisitId>,
    pub courier_id: CourierId,
    pub location: GeoPoint,
    pub store_name: String,
    pub observed_at: DateTime<Utc>,
}

impl Visit {
    /// Build an unsaved visit for `ping` at `store_name`
    pub fn from_ping(ping: &Ping, store_name: &str) -> Self {
        Self {
            id: None,
            courier_id: ping.courier_id.clone(),
            location: ping.location,
            store_name: store_name.to_string(),
            observed_at: ping.observed_at,
        }
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
