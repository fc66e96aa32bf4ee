use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use archive_ingest::ingestion::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionOptions, IngestionSeverity,
    IngestionStats, ingest_file,
};
use archive_ingest::store::SqliteStore;
use archive_ingest::types::{DataType, Field, Schema};

#[derive(Default)]
struct RecordingObserver {
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_failure(
        &self,
        _ctx: &IngestionContext,
        severity: IngestionSeverity,
        _error: &archive_ingest::IngestionError,
    ) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(
        &self,
        _ctx: &IngestionContext,
        severity: IngestionSeverity,
        _error: &archive_ingest::IngestionError,
    ) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn schema_id_only() -> Schema {
    Schema::new(vec![Field::new("id", DataType::Integer)])
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    };
    let store = SqliteStore::open_in_memory().unwrap();

    // Missing file -> Io error -> Critical
    let mut stats = IngestionStats::default();
    let _ = ingest_file("tests/fixtures/does_not_exist.json", "t", &schema_id_only(), &store, &opts, &mut stats)
        .unwrap_err();

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![IngestionSeverity::Critical]);
    assert_eq!(alerts, vec![IngestionSeverity::Critical]);
}

#[test]
fn parse_failures_are_warnings_without_alert() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };
    let store = SqliteStore::open_in_memory().unwrap();
    store.connection().execute("CREATE TABLE t (id INTEGER)", []).unwrap();

    let mut stats = IngestionStats::default();
    ingest_file("tests/fixtures/scenario_b.json", "t", &schema_id_only(), &store, &opts, &mut stats).unwrap();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Warning]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn write_failures_alert_at_error_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };
    // No table: both rows fail to insert.
    let store = SqliteStore::open_in_memory().unwrap();

    let mut stats = IngestionStats::default();
    ingest_file("tests/fixtures/scenario_a.json", "missing", &schema_id_only(), &store, &opts, &mut stats)
        .unwrap();

    assert_eq!(obs.failures.lock().unwrap().len(), 2);
    assert_eq!(
        obs.alerts.lock().unwrap().clone(),
        vec![IngestionSeverity::Error, IngestionSeverity::Error]
    );
}

#[test]
fn composite_fans_out_to_file_observer() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let log_path = std::env::temp_dir().join(format!("archive-ingest-observer-{nanos}.log"));
    let recording = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn IngestionObserver>> =
        vec![recording.clone(), Arc::new(FileObserver::new(&log_path))];
    let composite = CompositeObserver::new(observers);
    let opts = IngestionOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    };
    let store = SqliteStore::open_in_memory().unwrap();
    store.connection().execute("CREATE TABLE t (id INTEGER)", []).unwrap();

    let mut stats = IngestionStats::default();
    ingest_file("tests/fixtures/scenario_b.json", "t", &schema_id_only(), &store, &opts, &mut stats).unwrap();

    assert_eq!(recording.failures.lock().unwrap().len(), 1);
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("fail severity=Warning table=t"));
    assert!(log.contains("ok table=t"));
    assert!(log.contains("rows=1"));
}
