//! Destination table store.
//!
//! The ingestion loop only needs two operations from a database: create a table if it does not
//! exist yet, and insert one row. [`TableStore`] captures exactly that; [`SqliteStore`] is the
//! rusqlite-backed implementation.

mod sqlite;

pub use sqlite::{SqliteStore, quote_identifier};

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::{IngestionContext, IngestionOptions};
use crate::types::{Schema, TypedRow};

/// Write interface used by provisioning and streaming.
pub trait TableStore {
    /// Create `table` with one column per schema field unless it already exists.
    ///
    /// Must never drop or alter an existing table, whatever its shape.
    fn create_table_if_absent(&self, table: &str, schema: &Schema) -> IngestionResult<()>;

    /// Insert one row into `table`. All-or-nothing at row granularity.
    fn insert_row(&self, table: &str, row: &TypedRow) -> IngestionResult<()>;
}

/// Ensure `table` exists for `schema`.
///
/// A creation error is reported to the observer as [`IngestionError::TableCreation`] and
/// swallowed; rows sent to an unusable table later fail one by one as write errors. Returns
/// whether the table is known to exist.
pub fn provision_table<S: TableStore + ?Sized>(
    store: &S,
    table: &str,
    schema: &Schema,
    options: &IngestionOptions,
) -> bool {
    match store.create_table_if_absent(table, schema) {
        Ok(()) => {
            tracing::debug!(table, columns = schema.len(), "table provisioned");
            true
        }
        Err(e) => {
            let err = IngestionError::TableCreation {
                table: table.to_string(),
                message: e.to_string(),
            };
            options.report_failure(&IngestionContext::new(table, Some(table)), &err);
            false
        }
    }
}
