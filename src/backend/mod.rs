//! Contract consumed from the relational backend.
//!
//! The engine treats the backend as an opaque capability: acquire a
//! connection, run parameterized statements, and tell whether a transaction
//! is open. Dialect quirks live behind these traits; transaction control
//! stays with the caller (plain `BEGIN`/`COMMIT` through [`SqlConnection::execute`]).

#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::core::{Result, Row, SqlValue};
use async_trait::async_trait;

/// Hands out backend connections.
///
/// Implementations may pool, open per call, or return a fixed handle —
/// repositories only assume that two acquired connections are independent.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Acquires a connection. May fail.
    async fn connection(&self) -> Result<Box<dyn SqlConnection>>;
}

/// One backend connection.
#[async_trait]
pub trait SqlConnection: Send {
    /// Executes a parameterized query and returns its rows.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Executes a parameterized statement and returns the affected row count.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// True while a transaction is open on this connection. Layouts use this
    /// to decide whether a read should take row locks.
    fn in_transaction(&self) -> bool;
}
