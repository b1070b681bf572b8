//! Integration tests for loading, saving and reopening persisted state.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use wageticker_core::{
    Database, LoadStatus, MemoryBackend, PersistenceStore, SettingsInput, StateBackend,
    WageTracker, DEFAULT_RECORD_KEY,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

#[test]
fn test_browser_record_is_resumed() {
    // Shape written by the browser app: no schemaVersion, no hoursPerWeek.
    let raw = r#"{
        "settings": {
            "grossWage": 20,
            "age": 30,
            "netWage": 16.17917298578199,
            "secondRate": 0.0010700511233982797,
            "startDate": "2025-03-03T09:00:00.000Z",
            "lastSavedEarnings": 10,
            "lastSavedTimestamp": "2025-03-03T12:00:00.000Z"
        },
        "history": [
            {
                "startDate": "2025-02-01T09:00:00.000Z",
                "endDate": "2025-03-03T09:00:00.000Z",
                "grossWage": 18,
                "netWage": 14.9,
                "lastSavedEarnings": 2500.5
            },
            { "startDate": "not a date" }
        ]
    }"#;
    let backend = MemoryBackend::with_entry(DEFAULT_RECORD_KEY, raw);
    let mut tracker = WageTracker::open(PersistenceStore::new(backend));

    match tracker.load_status() {
        LoadStatus::Restored {
            from_version,
            repairs,
        } => {
            assert_eq!(*from_version, 1);
            assert!(repairs.iter().any(|r| r.contains("history entry 1")));
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(tracker.settings().hours_per_week, 40);
    assert_eq!(tracker.history().len(), 1);
    assert_eq!(tracker.history()[0].earned(), 2500.5);

    let rate = tracker.settings().second_rate;
    let total = tracker.refresh(Utc.with_ymd_and_hms(2025, 3, 3, 12, 1, 0).unwrap());
    assert!((total - (10.0 + rate * 60.0)).abs() < 1e-9);
}

#[test]
fn test_saved_record_is_versioned_and_camel_case() {
    let mut tracker = WageTracker::open(PersistenceStore::new(MemoryBackend::new()));
    tracker
        .apply_settings(SettingsInput::new(20.0, 40, 30), t0())
        .unwrap();
    tracker.checkpoint(t0() + Duration::minutes(1)).unwrap();

    let raw = tracker
        .store()
        .backend()
        .read(DEFAULT_RECORD_KEY)
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["schemaVersion"], 2);
    assert_eq!(value["settings"]["grossWage"], 20.0);
    assert_eq!(value["settings"]["hoursPerWeek"], 40);
    assert_eq!(value["settings"]["startDate"], "2025-03-03T09:00:00.000Z");
    assert_eq!(
        value["settings"]["lastSavedTimestamp"],
        "2025-03-03T09:01:00.000Z"
    );
    assert!(value["history"].as_array().unwrap().is_empty());
}

#[test]
fn test_garbage_record_falls_back_to_defaults() {
    let backend = MemoryBackend::with_entry(DEFAULT_RECORD_KEY, "{not json");
    let tracker = WageTracker::open(PersistenceStore::new(backend));
    assert!(matches!(tracker.load_status(), LoadStatus::Recovered { .. }));
    assert!(!tracker.settings().is_configured());
    assert_eq!(tracker.current_earnings(), 0.0);
}

#[test]
fn test_database_reopen_continues_accrual() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wageticker.db");

    let rate = {
        let db = Database::open_at(&path).unwrap();
        let mut tracker = WageTracker::open(PersistenceStore::new(db));
        assert_eq!(tracker.load_status(), &LoadStatus::Fresh);
        tracker
            .apply_settings(SettingsInput::new(20.0, 40, 30), t0())
            .unwrap();
        tracker.checkpoint(t0() + Duration::hours(1)).unwrap();
        tracker.settings().second_rate
    };

    let db = Database::open_at(&path).unwrap();
    let mut tracker = WageTracker::open(PersistenceStore::new(db));
    assert!(matches!(
        tracker.load_status(),
        LoadStatus::Restored { from_version: 2, .. }
    ));
    let total = tracker.refresh(t0() + Duration::hours(2));
    assert!((total - rate * 7200.0).abs() < 1e-9);
}

#[test]
fn test_history_survives_reopen_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wageticker.db");

    {
        let db = Database::open_at(&path).unwrap();
        let mut tracker = WageTracker::open(PersistenceStore::new(db));
        for (day, gross) in [18.0, 19.0, 20.0].into_iter().enumerate() {
            tracker
                .apply_settings(
                    SettingsInput::new(gross, 40, 30),
                    t0() + Duration::days(day as i64),
                )
                .unwrap();
        }
    }

    let db = Database::open_at(&path).unwrap();
    let tracker = WageTracker::open(PersistenceStore::new(db));
    let wages: Vec<f64> = tracker.history().iter().map(|h| h.gross_wage).collect();
    assert_eq!(wages, vec![19.0, 18.0]);
    assert_eq!(tracker.settings().gross_wage, 20.0);
}
