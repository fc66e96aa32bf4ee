//! `archive-ingest` loads archives of newline-delimited JSON records into SQLite tables without a
//! predefined schema.
//!
//! A run goes through four steps:
//!
//! 1. **Infer**: the first record of the smallest file of each table kind is turned into a
//!    [`types::Schema`] ([`ingestion::inference`]).
//! 2. **Provision**: one table per kind is created if it does not exist yet
//!    ([`store::provision_table`]).
//! 3. **Coerce**: every record is narrowed to its schema's storage types
//!    ([`ingestion::coercion`]).
//! 4. **Stream**: rows are inserted one at a time while parse and write failures are counted
//!    ([`ingestion::stream`]).
//!
//! [`pipeline::Pipeline`] wires these together and, optionally, discovers and decompresses the
//! `<group>_<tableKind>.zst` archives first.
//!
//! ## Type mapping
//!
//! | JSON value | Column type | Stored value |
//! |---|---|---|
//! | integer (or whole float) | `INTEGER` | the number |
//! | float with a fraction | `REAL` | the number |
//! | boolean | `INTEGER` | `1` / `0` |
//! | string, null, object, array | `TEXT` | JSON text (`"x"` keeps its quotes) |
//!
//! Use [`ingestion::TextEncoding::Native`] to store strings verbatim instead.
//!
//! ## Example: ingest decompressed files
//!
//! ```no_run
//! use archive_ingest::pipeline::{DecompressedFile, Pipeline, PipelineOptions};
//! use archive_ingest::store::SqliteStore;
//!
//! # fn main() -> Result<(), archive_ingest::IngestionError> {
//! let store = SqliteStore::open("reddit.db")?;
//! let files = vec![
//!     DecompressedFile::from_path("decompressed/rust_comments.json")?,
//!     DecompressedFile::from_path("decompressed/rust_submissions.json")?,
//! ];
//! let report = Pipeline::new(&store, PipelineOptions::default()).ingest_files(&files);
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: infer a schema
//!
//! ```rust
//! use archive_ingest::ingestion::infer_schema;
//! use archive_ingest::types::{DataType, Field, Schema};
//!
//! let sample = serde_json::json!({"a": 1, "b": 1.5, "c": "x", "d": null});
//! let schema = infer_schema(sample.as_object().unwrap());
//! assert_eq!(
//!     schema,
//!     Schema::new(vec![
//!         Field::new("a", DataType::Integer),
//!         Field::new("b", DataType::Real),
//!         Field::new("c", DataType::Text),
//!         Field::new("d", DataType::Text),
//!     ])
//! );
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: inference, coercion, streaming, counters and observers
//! - [`store`]: the table store seam and its SQLite implementation
//! - [`pipeline`]: archive discovery, decompression and orchestration
//! - [`types`]: schema and row types
//! - [`error`]: error types used across the crate

pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
