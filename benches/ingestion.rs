use std::hint::black_box;
use std::time::{SystemTime, UNIX_EPOCH};

use criterion::{Criterion, criterion_group, criterion_main};

use archive_ingest::ingestion::{CoercionOptions, IngestionOptions, IngestionStats, coerce_record, infer_schema, ingest_file};
use archive_ingest::store::{SqliteStore, provision_table};

const RECORD: &str = r#"{"id":123456,"author":"someone","body":"a reasonably long comment body with some words","score":17,"ratio":0.93,"edited":false,"gildings":{"gid_1":2},"all_awardings":[],"parent_id":null}"#;

fn bench_coerce(c: &mut Criterion) {
    let record: serde_json::Value = serde_json::from_str(RECORD).unwrap();
    let obj = record.as_object().unwrap();
    let schema = infer_schema(obj);
    let opts = CoercionOptions::default();

    c.bench_function("coerce_record", |b| {
        b.iter(|| coerce_record(black_box(&schema), black_box(obj), &opts))
    });
}

fn bench_stream(c: &mut Criterion) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("archive-ingest-bench-{nanos}.json"));
    let mut contents = String::new();
    for _ in 0..1_000 {
        contents.push_str(RECORD);
        contents.push('\n');
    }
    std::fs::write(&path, contents).unwrap();

    let record: serde_json::Value = serde_json::from_str(RECORD).unwrap();
    let schema = infer_schema(record.as_object().unwrap());
    let opts = IngestionOptions::default();

    c.bench_function("ingest_file_1k_rows_in_memory", |b| {
        b.iter(|| {
            let store = SqliteStore::open_in_memory().unwrap();
            provision_table(&store, "comments", &schema, &opts);
            let mut stats = IngestionStats::default();
            ingest_file(&path, "comments", &schema, &store, &opts, &mut stats).unwrap();
            stats
        })
    });
}

criterion_group!(benches, bench_coerce, bench_stream);
criterion_main!(benches);
