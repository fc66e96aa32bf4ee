use std::sync::{Arc, Mutex};

use archive_ingest::IngestionError;
use archive_ingest::ingestion::{IngestionContext, IngestionObserver, IngestionOptions, IngestionSeverity};
use archive_ingest::store::{SqliteStore, TableStore, provision_table};
use archive_ingest::types::{DataType, Field, Schema};

#[derive(Default)]
struct RecordingObserver {
    failures: Mutex<Vec<(IngestionSeverity, String)>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.failures.lock().unwrap().push((severity, error.to_string()));
    }
}

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Integer),
        Field::new("score", DataType::Real),
        Field::new("body", DataType::Text),
    ])
}

fn column_types(store: &SqliteStore, table: &str) -> Vec<(String, String)> {
    let mut stmt = store
        .connection()
        .prepare(&format!("PRAGMA table_info(\"{table}\")"))
        .unwrap();
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    columns
}

#[test]
fn creates_one_column_per_field() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert!(provision_table(&store, "comments", &schema(), &IngestionOptions::default()));

    assert!(store.table_exists("comments").unwrap());
    assert_eq!(
        column_types(&store, "comments"),
        vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("score".to_string(), "REAL".to_string()),
            ("body".to_string(), "TEXT".to_string()),
        ]
    );
}

#[test]
fn provisioning_twice_is_a_no_op() {
    let store = SqliteStore::open_in_memory().unwrap();
    let opts = IngestionOptions::default();
    assert!(provision_table(&store, "comments", &schema(), &opts));
    assert!(provision_table(&store, "comments", &schema(), &opts));

    let tables: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn existing_table_with_other_shape_is_left_alone() {
    let store = SqliteStore::open_in_memory().unwrap();
    let other = Schema::new(vec![Field::new("legacy", DataType::Text)]);
    store.create_table_if_absent("comments", &other).unwrap();

    assert!(provision_table(&store, "comments", &schema(), &IngestionOptions::default()));
    assert_eq!(
        column_types(&store, "comments"),
        vec![("legacy".to_string(), "TEXT".to_string())]
    );
}

#[test]
fn creation_error_is_reported_not_returned() {
    let store = SqliteStore::open_in_memory().unwrap();
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    // SQLite rejects a table without columns.
    assert!(!provision_table(&store, "empty", &Schema::default(), &opts));
    assert!(!store.table_exists("empty").unwrap());

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, IngestionSeverity::Error);
    assert!(failures[0].1.contains("failed to create table 'empty'"));
}
