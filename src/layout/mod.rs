//! Physical storage strategies: how rows are shaped, queried, written and
//! deleted for one value type.

mod changes;
mod common;
mod minimal;
mod persistent;

pub use changes::{ChangesDetector, StoredValue};
pub use minimal::MinimalLayout;
pub use persistent::PersistentLayout;

use crate::backend::SqlConnection;
use crate::codec::ValueCodec;
use crate::core::{AttrError, Result, Value};
use async_trait::async_trait;

/// One attribute row as read from the backend. Repositories translate the
/// tag back to a caller-level key and group rows per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub link_id: i64,
    pub type_tag: i32,
    pub value: Value,
}

/// Storage strategy for one physical table shape.
///
/// A layout builds and runs the SQL for a value type, given the codec that
/// binds and reads the value columns. It never opens transactions of its
/// own: atomicity across its statements belongs to the supplied connection.
#[async_trait]
pub trait TableLayout: Send + Sync {
    /// Reads every row matching the link ids and type tags, in result-set
    /// order. Values for the same `(link, tag)` pair accumulate; nothing is
    /// de-duplicated here.
    async fn find_by_link_id(
        &self,
        codec: &dyn ValueCodec,
        conn: &mut dyn SqlConnection,
        table_name: &str,
        link_ids: &[i64],
        type_tags: &[i32],
    ) -> Result<Vec<StoredRow>>;

    /// Replaces the rows of every tag present in `values`: prior rows of a
    /// touched tag are retired, then one row per value is inserted. A tag
    /// with an empty value list is cleared and nothing is inserted for it.
    async fn store(
        &self,
        codec: &dyn ValueCodec,
        conn: &mut dyn SqlConnection,
        table_name: &str,
        link_id: i64,
        values: &[(i32, Vec<Value>)],
    ) -> Result<()>;

    /// Retires the rows of the given tags. Unknown tags are a no-op; an
    /// empty tag set never reaches the backend.
    async fn delete(
        &self,
        conn: &mut dyn SqlConnection,
        table_name: &str,
        link_id: i64,
        type_tags: &[i32],
    ) -> Result<()>;
}

/// Escapes a table or column name with backtick delimiters.
///
/// Accepts a bare name (wrapped) or an already fully delimited name
/// (returned as is). Empty, partially delimited or delimiter-containing
/// names are rejected.
pub fn escape_name(name: &str) -> Result<String> {
    if !name.is_empty() {
        if let Some(inner) = name.strip_prefix('`') {
            if let Some(inner) = inner.strip_suffix('`') {
                if !inner.is_empty() && !inner.contains('`') {
                    return Ok(name.to_string());
                }
            }
        } else if !name.contains('`') {
            return Ok(format!("`{name}`"));
        }
    }
    Err(AttrError::InvalidIdentifier(name.to_string()))
}

/// `?,?,...,?` with one placeholder per parameter.
pub(crate) fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::{Row, SqlValue};

    /// Connection double that records statements and plays back canned rows.
    pub struct RecordingConnection {
        pub statements: Vec<(String, Vec<SqlValue>)>,
        pub rows: Vec<Row>,
        pub in_tx: bool,
    }

    impl RecordingConnection {
        pub fn new() -> Self {
            Self {
                statements: Vec::new(),
                rows: Vec::new(),
                in_tx: false,
            }
        }

        pub fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                statements: Vec::new(),
                rows,
                in_tx: false,
            }
        }

        pub fn last_sql(&self) -> &str {
            &self.statements.last().expect("no statement recorded").0
        }
    }

    #[async_trait]
    impl SqlConnection for RecordingConnection {
        async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(self.rows.clone())
        }

        async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(0)
        }

        fn in_transaction(&self) -> bool {
            self.in_tx
        }
    }
}
