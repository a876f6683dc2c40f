//! Tests for the VisitRecorder module

use super::*;
use crate::domain::error::RepositoryError;
use crate::domain::types::{CourierId, GeoPoint};
use crate::io::memory::{InMemoryVisitStore, StaticStoreCatalog};
use chrono::{DateTime, TimeZone, Utc};

const ATASEHIR: GeoPoint = GeoPoint::new(40.9923307, 29.1244229);
const NOVADA: GeoPoint = GeoPoint::new(40.986106, 29.1161293);
const CADDEBOSTAN: GeoPoint = GeoPoint::new(40.9632463, 29.0630908);

/// ~74 m north of Ataşehir, far from every other store
const NEAR_ATASEHIR: GeoPoint = GeoPoint::new(40.9930, 29.1244229);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 1, 12, 0, 0).unwrap()
}

fn opened() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn secs(s: i64) -> Duration {
    Duration::seconds(s)
}

/// Test harness that keeps the visit store reachable for assertions
struct TestRecorder {
    recorder: VisitRecorder,
    visits: Arc<InMemoryVisitStore>,
    metrics: Arc<Metrics>,
}

impl std::ops::Deref for TestRecorder {
    type Target = VisitRecorder;
    fn deref(&self) -> &Self::Target {
        &self.recorder
    }
}

fn create_test_recorder(stores: Vec<Store>) -> TestRecorder {
    let visits = Arc::new(InMemoryVisitStore::new());
    let metrics = Arc::new(Metrics::new());
    let recorder = VisitRecorder::new(
        Arc::new(StaticStoreCatalog::new(stores)),
        visits.clone(),
        metrics.clone(),
    );
    TestRecorder { recorder, visits, metrics }
}

fn default_stores() -> Vec<Store> {
    vec![
        Store::new("Ataşehir MMM Migros", ATASEHIR, opened()),
        Store::new("Novada MMM Migros", NOVADA, opened()),
        Store::new("Caddebostan MMM Migros", CADDEBOSTAN, opened()),
    ]
}

fn ping(courier: &str, location: GeoPoint, at: DateTime<Utc>) -> Ping {
    Ping::new(CourierId::new(courier), location, at)
}

fn stored_visits(recorder: &TestRecorder, courier: &str) -> Vec<Visit> {
    recorder.visits.find_visits_by_courier(&CourierId::new(courier)).unwrap()
}

#[test]
fn test_records_visit_within_radius() {
    let recorder = create_test_recorder(default_stores());

    let recorded = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();

    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].store_name, "Ataşehir MMM Migros");
    assert_eq!(recorded[0].location, NEAR_ATASEHIR);
    assert_eq!(recorded[0].observed_at, t0());
    assert!(recorded[0].id.is_some());
    assert_eq!(stored_visits(&recorder, "c1"), recorded.to_vec());
}

#[test]
fn test_empty_catalog() {
    let recorder = create_test_recorder(Vec::new());

    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0()));

    assert!(matches!(result, Err(TrackingError::StoreCatalogEmpty)));
    assert!(recorder.visits.is_empty());
}

#[test]
fn test_no_store_in_range() {
    let recorder = create_test_recorder(default_stores());

    let result = recorder.record_ping(&ping("c1", GeoPoint::new(41.2, 28.7), t0()));

    match result {
        Err(TrackingError::NoStoreInRange { courier_id, nearby }) => {
            assert_eq!(courier_id.as_str(), "c1");
            assert_eq!(nearby, 0);
        }
        other => panic!("expected NoStoreInRange, got {:?}", other),
    }
    assert!(recorder.visits.is_empty());
}

#[test]
fn test_timestamp_before_store_creation() {
    let stores = vec![
        Store::new("Ataşehir MMM Migros", ATASEHIR, t0() + secs(3600)),
        Store::new("Caddebostan MMM Migros", CADDEBOSTAN, opened()),
    ];
    let recorder = create_test_recorder(stores);

    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0()));

    match result {
        Err(TrackingError::TimestampBeforeStoreCreation { store, observed_at, created_at }) => {
            assert_eq!(store, "Ataşehir MMM Migros");
            assert_eq!(observed_at, t0());
            assert_eq!(created_at, t0() + secs(3600));
        }
        other => panic!("expected TimestampBeforeStoreCreation, got {:?}", other),
    }
}

#[test]
fn test_far_store_created_later_is_ignored() {
    // Only nearby stores are validated against the ping time
    let stores = vec![
        Store::new("Ataşehir MMM Migros", ATASEHIR, opened()),
        Store::new("Caddebostan MMM Migros", CADDEBOSTAN, t0() + secs(3600)),
    ];
    let recorder = create_test_recorder(stores);

    let recorded = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    assert_eq!(recorded.len(), 1);
}

#[test]
fn test_store_created_at_ping_time_is_valid() {
    let stores = vec![Store::new("Ataşehir MMM Migros", ATASEHIR, t0())];
    let recorder = create_test_recorder(stores);

    assert!(recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).is_ok());
}

#[test]
fn test_timestamp_abort_leaves_no_partial_writes() {
    // Two overlapping stores; the one listed second is not open yet.
    // The valid store must not be written before the abort.
    let overlapping = GeoPoint::new(40.9925, 29.1244229);
    let stores = vec![
        Store::new("Ataşehir MMM Migros", ATASEHIR, opened()),
        Store::new("Ataşehir Express", overlapping, t0() + secs(60)),
    ];
    let recorder = create_test_recorder(stores);

    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0()));

    assert!(matches!(result, Err(TrackingError::TimestampBeforeStoreCreation { .. })));
    assert!(recorder.visits.is_empty());
}

#[test]
fn test_duplicate_within_window_not_recorded() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(30)));

    match result {
        Err(TrackingError::NoStoreInRange { nearby, .. }) => assert_eq!(nearby, 1),
        other => panic!("expected NoStoreInRange, got {:?}", other),
    }
    assert_eq!(stored_visits(&recorder, "c1").len(), 1);
    assert_eq!(recorder.metrics.duplicates_suppressed_total(), 1);
}

#[test]
fn test_ping_after_window_recorded() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let recorded = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(90))).unwrap();

    assert_eq!(recorded.len(), 1);
    assert_eq!(stored_visits(&recorder, "c1").len(), 2);
}

#[test]
fn test_exactly_one_window_later_is_duplicate() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(60)));

    assert!(matches!(result, Err(TrackingError::NoStoreInRange { nearby: 1, .. })));
    assert_eq!(stored_visits(&recorder, "c1").len(), 1);
}

#[test]
fn test_dedup_compares_against_latest_visit() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(61))).unwrap();

    // 100s after the first visit but only 39s after the second
    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(100)));
    assert!(result.is_err());
    assert_eq!(stored_visits(&recorder, "c1").len(), 2);
}

#[test]
fn test_dedup_is_per_courier() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let recorded = recorder.record_ping(&ping("c2", NEAR_ATASEHIR, t0() + secs(10))).unwrap();

    assert_eq!(recorded.len(), 1);
    assert_eq!(recorder.visits.courier_count(), 2);
}

#[test]
fn test_dedup_is_per_store() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let recorded = recorder.record_ping(&ping("c1", NOVADA, t0() + secs(10))).unwrap();

    assert_eq!(recorded[0].store_name, "Novada MMM Migros");
}

#[test]
fn test_out_of_order_ping_ignores_later_visits() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(30))).unwrap();
    // Earlier ping arrives late; the window ends at its own timestamp
    let recorded = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();

    assert_eq!(recorded.len(), 1);
    assert_eq!(stored_visits(&recorder, "c1").len(), 2);
}

#[test]
fn test_overlapping_stores_all_recorded() {
    let overlapping = GeoPoint::new(40.9925, 29.1244229);
    let stores = vec![
        Store::new("Ataşehir MMM Migros", ATASEHIR, opened()),
        Store::new("Ataşehir Express", overlapping, opened()),
        Store::new("Caddebostan MMM Migros", CADDEBOSTAN, opened()),
    ];
    let recorder = create_test_recorder(stores);

    let recorded = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();

    let mut names: Vec<_> = recorded.iter().map(|v| v.store_name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Ataşehir Express", "Ataşehir MMM Migros"]);
    assert_eq!(recorder.metrics.visits_recorded_total(), 2);
}

#[test]
fn test_overlapping_stores_partial_duplicate() {
    let overlapping = GeoPoint::new(40.9925, 29.1244229);
    let stores = vec![
        Store::new("Ataşehir MMM Migros", ATASEHIR, opened()),
        Store::new("Ataşehir Express", overlapping, opened()),
    ];
    let recorder = create_test_recorder(stores);

    // Seed a recent visit at one of the two stores
    recorder
        .visits
        .save_visit(Visit {
            id: None,
            courier_id: CourierId::new("c1"),
            location: NEAR_ATASEHIR,
            store_name: "Ataşehir Express".to_string(),
            observed_at: t0() - secs(20),
        })
        .unwrap();

    let recorded = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();

    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].store_name, "Ataşehir MMM Migros");
}

#[test]
fn test_custom_radius() {
    let recorder = create_test_recorder(default_stores());
    let narrow = VisitRecorder::new(
        Arc::new(StaticStoreCatalog::new(default_stores())),
        recorder.visits.clone(),
        recorder.metrics.clone(),
    )
    .with_radius_m(50.0);

    assert_eq!(narrow.classifier().radius_m(), 50.0);
    assert!(matches!(
        narrow.record_ping(&ping("c1", NEAR_ATASEHIR, t0())),
        Err(TrackingError::NoStoreInRange { nearby: 0, .. })
    ));
}

#[test]
fn test_custom_window() {
    let visits = Arc::new(InMemoryVisitStore::new());
    let recorder = VisitRecorder::new(
        Arc::new(StaticStoreCatalog::new(default_stores())),
        visits.clone(),
        Arc::new(Metrics::new()),
    )
    .with_dedup_window(secs(10));

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + secs(11))).unwrap();

    assert_eq!(visits.len(), 2);
}

#[test]
fn test_from_config_uses_matching_settings() {
    let config = Config::default().with_radius_m(250.0).with_dedup_window_secs(120);
    let recorder = VisitRecorder::from_config(
        &config,
        Arc::new(StaticStoreCatalog::new(default_stores())),
        Arc::new(InMemoryVisitStore::new()),
        Arc::new(Metrics::new()),
    );

    assert_eq!(recorder.classifier().radius_m(), 250.0);
    assert_eq!(recorder.deduper().window(), secs(120));
}

#[test]
fn test_from_config_oversized_window_does_not_panic() {
    let config = Config::default().with_dedup_window_secs(i64::MAX);
    let visits = Arc::new(InMemoryVisitStore::new());
    let recorder = VisitRecorder::from_config(
        &config,
        Arc::new(StaticStoreCatalog::new(default_stores())),
        visits.clone(),
        Arc::new(Metrics::new()),
    );

    assert_eq!(recorder.deduper().window(), Duration::MAX);
    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let repeat = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0() + Duration::days(30)));

    assert!(matches!(repeat, Err(TrackingError::NoStoreInRange { nearby: 1, .. })));
    assert_eq!(visits.len(), 1);
}

#[test]
fn test_metrics_track_outcomes() {
    let recorder = create_test_recorder(default_stores());

    recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0())).unwrap();
    let _ = recorder.record_ping(&ping("c1", GeoPoint::new(41.2, 28.7), t0() + secs(5)));

    let summary = recorder.metrics.report();
    assert_eq!(summary.pings_total, 2);
    assert_eq!(summary.visits_recorded_total, 1);
    assert_eq!(summary.no_store_in_range_total, 1);
}

/// Catalog whose backend is unavailable
struct FailingCatalog;

impl StoreCatalog for FailingCatalog {
    fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        Err(RepositoryError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "catalog offline",
        )))
    }
}

#[test]
fn test_repository_error_propagates() {
    let recorder = VisitRecorder::new(
        Arc::new(FailingCatalog),
        Arc::new(InMemoryVisitStore::new()),
        Arc::new(Metrics::new()),
    );

    let result = recorder.record_ping(&ping("c1", NEAR_ATASEHIR, t0()));

    assert!(matches!(result, Err(TrackingError::Repository(RepositoryError::Io(_)))));
}
