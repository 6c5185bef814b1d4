//! Value codecs: convert one value type to and from backend placeholders and
//! name the columns (and logical table) it occupies.

mod single;

pub use single::{InstantMillisCodec, InstantSecondsCodec, JsonCodec, LongCodec, TextCodec};

use crate::core::{Result, SqlValue, Value};
use std::sync::Arc;

/// Conversion between one [`Value`] and its backend placeholder columns.
///
/// Column order is fixed per codec: `bind` emits and `decode` consumes the
/// columns in exactly the order `column_names` declares them.
pub trait ValueCodec: Send + Sync {
    /// Logical name; combined with the repository's table prefix it yields
    /// the physical table name.
    fn logical_name(&self) -> &str;

    /// Names of the value columns, in binding order.
    fn column_names(&self) -> &[&str];

    /// Converts a value into placeholder columns. Fails with
    /// [`UnexpectedValue`](crate::AttrError::UnexpectedValue) when the value's
    /// runtime type does not match the type this codec was registered for.
    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>>;

    /// Reads a value back from its columns (a slice starting at the first
    /// value column of a result row).
    fn decode(&self, columns: &[SqlValue]) -> Result<Value>;
}

/// Rebinds a codec to a different logical table name, leaving the value
/// conversion untouched. Returns the input unchanged when the name already
/// matches.
pub fn with_logical_name(codec: Arc<dyn ValueCodec>, name: impl Into<String>) -> Arc<dyn ValueCodec> {
    let name = name.into();
    if name == codec.logical_name() {
        return codec;
    }
    Arc::new(RenamedCodec { inner: codec, name })
}

struct RenamedCodec {
    inner: Arc<dyn ValueCodec>,
    name: String,
}

impl ValueCodec for RenamedCodec {
    fn logical_name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> &[&str] {
        self.inner.column_names()
    }

    fn bind(&self, value: &Value) -> Result<Vec<SqlValue>> {
        self.inner.bind(value)
    }

    fn decode(&self, columns: &[SqlValue]) -> Result<Value> {
        self.inner.decode(columns)
    }
}
