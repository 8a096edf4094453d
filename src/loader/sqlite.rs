//! SQLite-backed [`TableStore`].

use std::path::{Path, PathBuf};

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, params_from_iter};

use crate::error::{LoadError, LoadResult};
use crate::types::{DataSet, Value};

use super::{StoreConnector, TableStore};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Int64(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Float64(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Utf8(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// A single SQLite connection.
///
/// Each append runs in its own transaction, so a batch is stored entirely or not at all.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| LoadError::connect(path.display().to_string(), e))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> LoadResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| LoadError::connect(":memory:", e))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection (schema setup, queries).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_all(&mut self, table: &str, dataset: &DataSet) -> rusqlite::Result<usize> {
        let columns: Vec<String> = dataset.schema.field_names().map(quote_identifier).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in &dataset.rows {
                written += stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

impl TableStore for SqliteStore {
    fn append(&mut self, table: &str, dataset: &DataSet) -> LoadResult<usize> {
        self.insert_all(table, dataset)
            .map_err(|e| LoadError::storage(table, e))
    }
}

/// Opens a [`SqliteStore`] on a database file per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreConnector for SqliteConnector {
    type Store = SqliteStore;

    fn connect(&self) -> LoadResult<SqliteStore> {
        SqliteStore::open(&self.path)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
