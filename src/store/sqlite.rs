use std::path::Path;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use rusqlite::{Connection, params_from_iter};

use crate::error::IngestionResult;
use crate::types::{Schema, TypedRow, Value};

use super::TableStore;

/// SQLite-backed [`TableStore`].
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> IngestionResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> IngestionResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Underlying connection, for queries outside the ingestion path.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Whether a table named `table` exists.
    pub fn table_exists(&self, table: &str) -> IngestionResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn row_count(&self, table: &str) -> IngestionResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }
}

impl TableStore for SqliteStore {
    fn create_table_if_absent(&self, table: &str, schema: &Schema) -> IngestionResult<()> {
        let columns = schema
            .fields
            .iter()
            .map(|f| format!("{} {}", quote_identifier(&f.name), f.data_type.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            quote_identifier(table)
        );
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn insert_row(&self, table: &str, row: &TypedRow) -> IngestionResult<()> {
        let columns = row
            .iter()
            .map(|(name, _)| quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=row.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_identifier(table)
        );

        // Rows of one table share their column list, so the statement cache hits after the
        // first insert.
        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(row.values()))?;
        Ok(())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Quote an SQL identifier with double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("id"), "\"id\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn keyword_columns_are_usable() {
        let store = SqliteStore::open_in_memory().unwrap();
        let schema = Schema::new(vec![
            Field::new("select", DataType::Integer),
            Field::new("group", DataType::Text),
        ]);
        store.create_table_if_absent("order", &schema).unwrap();

        let mut row = TypedRow::default();
        row.push("select", Value::Integer(1));
        row.push("group", Value::Text("g".to_string()));
        store.insert_row("order", &row).unwrap();
        assert_eq!(store.row_count("order").unwrap(), 1);
    }
}
