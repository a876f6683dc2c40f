//! Ping feed parsing and validation
//!
//! Pings arrive one JSON object per line:
//! `{"courier_id": "<uuid>", "lat": 40.99, "lng": 29.12, "timestamp": "01/08/2024 12:00"}`
//!
//! `timestamp` may be RFC 3339, `dd/MM/yyyy HH:mm` (UTC), or epoch milliseconds.

use crate::domain::types::{CourierId, GeoPoint, Ping};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Minute-precision request format
pub const MINUTE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Why a feed line was not turned into a ping
#[derive(Debug, thiserror::Error)]
pub enum PingError {
    #[error("ping line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed ping: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("courier id cannot be blank")]
    BlankCourierId,

    #[error("invalid courier id format: {0}")]
    InvalidCourierId(String),

    #[error("latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(f64),

    #[error("unrecognized timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Timestamp that can be either a formatted string or epoch milliseconds
#[derive(Debug, Clone, PartialEq)]
enum TimestampValue {
    Text(String),
    EpochMs(i64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<TimestampValue, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = TimestampValue;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer timestamp")
        }

        fn visit_str<E>(self, value: &str) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::Text(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::Text(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            i64::try_from(value)
                .map(TimestampValue::EpochMs)
                .map_err(|_| E::custom("epoch milliseconds out of range"))
        }

        fn visit_i64<E>(self, value: i64) -> Result<TimestampValue, E>
        where
            E: de::Error,
        {
            Ok(TimestampValue::EpochMs(value))
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

/// Raw ping as it appears on the wire
#[derive(Debug, Deserialize)]
struct PingRecord {
    courier_id: String,
    lat: f64,
    lng: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: TimestampValue,
}

/// Parse a timestamp in any accepted representation
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, PingError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, MINUTE_FORMAT) {
        return Ok(naive.and_utc());
    }
    Err(PingError::InvalidTimestamp(text.to_string()))
}

fn resolve_timestamp(value: TimestampValue) -> Result<DateTime<Utc>, PingError> {
    match value {
        TimestampValue::Text(text) => parse_timestamp(&text),
        TimestampValue::EpochMs(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| PingError::InvalidTimestamp(ms.to_string())),
    }
}

fn validate_courier_id(raw: &str) -> Result<CourierId, PingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PingError::BlankCourierId);
    }
    Uuid::parse_str(trimmed).map_err(|_| PingError::InvalidCourierId(trimmed.to_string()))?;
    Ok(CourierId::new(trimmed))
}

/// Parse and validate a single feed line
pub fn parse_ping(line: &str) -> Result<Ping, PingError> {
    let record: PingRecord = serde_json::from_str(line)?;

    let courier_id = validate_courier_id(&record.courier_id)?;
    if !(-90.0..=90.0).contains(&record.lat) {
        return Err(PingError::LatitudeOutOfRange(record.lat));
    }
    if !(-180.0..=180.0).contains(&record.lng) {
        return Err(PingError::LongitudeOutOfRange(record.lng));
    }
    let observed_at = resolve_timestamp(record.timestamp)?;

    Ok(Ping::new(courier_id, GeoPoint::new(record.lat, record.lng), observed_at))
}

/// Parse a raw feed line as read from the wire
pub fn parse_ping_bytes(line: &[u8]) -> Result<Ping, PingError> {
    parse_ping(std::str::from_utf8(line)?)
}
