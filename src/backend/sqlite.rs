//! Embedded SQLite adapter over rusqlite.
//!
//! Opens one connection per acquisition so that concurrent repository tasks
//! never share a handle. WAL journaling is enabled by default to let readers
//! and a writer coexist on the same database file.

use crate::backend::{ConnectionProvider, SqlConnection};
use crate::core::{AttrError, Result, Row, SqlValue};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl From<rusqlite::Error> for AttrError {
    fn from(err: rusqlite::Error) -> Self {
        AttrError::backend(err)
    }
}

/// SQLite connection configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file path
    pub path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,

    /// Enable write-ahead logging on every opened connection
    pub wal: bool,
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }

    /// Set the busy timeout
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Disable or enable WAL journaling
    pub fn wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }
}

/// Connection provider backed by a SQLite database file.
pub struct SqliteProvider {
    config: SqliteConfig,
}

impl SqliteProvider {
    /// Provider with default configuration for the given database file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            config: SqliteConfig::new(path),
        }
    }

    pub fn with_config(config: SqliteConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectionProvider for SqliteProvider {
    async fn connection(&self) -> Result<Box<dyn SqlConnection>> {
        let conn = rusqlite::Connection::open(&self.config.path)?;
        conn.busy_timeout(self.config.busy_timeout)?;
        if self.config.wal {
            // journal_mode returns the resulting mode as a row
            conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        }
        Ok(Box::new(SqliteConnection { inner: conn }))
    }
}

/// One open SQLite connection.
pub struct SqliteConnection {
    inner: rusqlite::Connection,
}

impl SqliteConnection {
    /// Wraps an already opened rusqlite connection.
    pub fn from_connection(inner: rusqlite::Connection) -> Self {
        Self { inner }
    }
}

fn bind_param(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Float(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlValue::Boolean(b) => rusqlite::types::Value::Integer(*b as i64),
    }
}

fn read_column(value: ValueRef<'_>) -> Result<SqlValue> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(i) => Ok(SqlValue::Integer(i)),
        ValueRef::Real(f) => Ok(SqlValue::Float(f)),
        ValueRef::Text(bytes) => Ok(SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(AttrError::backend_msg("unsupported BLOB column")),
    }
}

#[async_trait]
impl SqlConnection for SqliteConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut stmt = self.inner.prepare(sql)?;
        let column_count = stmt.column_count();
        let bound: Vec<rusqlite::types::Value> = params.iter().map(bind_param).collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                record.push(read_column(row.get_ref(i)?)?);
            }
            out.push(record);
        }
        Ok(out)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let bound: Vec<rusqlite::types::Value> = params.iter().map(bind_param).collect();
        let affected = self.inner.execute(sql, rusqlite::params_from_iter(bound))?;
        Ok(affected as u64)
    }

    fn in_transaction(&self) -> bool {
        !self.inner.is_autocommit()
    }
}
