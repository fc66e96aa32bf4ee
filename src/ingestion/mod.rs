//! Schema inference, record coercion and per-file streaming.
//!
//! - [`inference`]: derive a [`crate::types::Schema`] from a sample record
//! - [`coercion`]: narrow a raw JSON record to a [`crate::types::TypedRow`]
//! - [`stream`]: read a decompressed file line by line and insert each row
//! - [`stats`]: parse/write counters and failure ratios
//! - [`observability`]: observer hooks for logging and alerts

pub mod coercion;
pub mod inference;
pub mod observability;
pub mod stats;
pub mod stream;

pub use coercion::{CoercionOptions, TextEncoding, coerce_record, coerce_value};
pub use inference::{SampleBasedInference, SchemaInferencer, infer_data_type, infer_schema};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, TracingObserver,
};
pub use stats::IngestionStats;
pub use stream::{IngestionOptions, ingest_file};
