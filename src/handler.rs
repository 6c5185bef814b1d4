//! The registrable unit: a table layout bound to a codec and a table name.

use crate::backend::SqlConnection;
use crate::codec::ValueCodec;
use crate::core::{Result, Value};
use crate::layout::{StoredRow, TableLayout};
use async_trait::async_trait;
use std::sync::Arc;

/// Reads and writes every attribute of one value type.
///
/// Works on erased `(type_tag, value)` pairs so the registry can hold
/// handlers for different entity kinds behind one object type; repositories
/// translate tags back into their key enums.
#[async_trait]
pub trait TypeHandler: Send + Sync {
    async fn find_by_link_id(
        &self,
        conn: &mut dyn SqlConnection,
        table_prefix: &str,
        link_ids: &[i64],
        type_tags: &[i32],
    ) -> Result<Vec<StoredRow>>;

    async fn store(
        &self,
        conn: &mut dyn SqlConnection,
        table_prefix: &str,
        link_id: i64,
        values: &[(i32, Vec<Value>)],
    ) -> Result<()>;

    async fn delete(
        &self,
        conn: &mut dyn SqlConnection,
        table_prefix: &str,
        link_id: i64,
        type_tags: &[i32],
    ) -> Result<()>;
}

/// [`TypeHandler`] that delegates to a [`TableLayout`] and a [`ValueCodec`].
/// The physical table is the repository's prefix joined with the codec's
/// logical name.
pub struct LayoutTypeHandler {
    layout: Arc<dyn TableLayout>,
    codec: Arc<dyn ValueCodec>,
}

impl LayoutTypeHandler {
    pub fn new(layout: Arc<dyn TableLayout>, codec: Arc<dyn ValueCodec>) -> Self {
        Self { layout, codec }
    }

    pub fn table_name(&self, table_prefix: &str) -> String {
        format!("{table_prefix}{}", self.codec.logical_name())
    }
}

#[async_trait]
impl TypeHandler for LayoutTypeHandler {
    async fn find_by_link_id(
        &self,
        conn: &mut dyn SqlConnection,
        table_prefix: &str,
        link_ids: &[i64],
        type_tags: &[i32],
    ) -> Result<Vec<StoredRow>> {
        self.layout
            .find_by_link_id(
                self.codec.as_ref(),
                conn,
                &self.table_name(table_prefix),
                link_ids,
                type_tags,
            )
            .await
    }

    async fn store(
        &self,
        conn: &mut dyn SqlConnection,
        table_prefix: &str,
        link_id: i64,
        values: &[(i32, Vec<Value>)],
    ) -> Result<()> {
        self.layout
            .store(
                self.codec.as_ref(),
                conn,
                &self.table_name(table_prefix),
                link_id,
                values,
            )
            .await
    }

    async fn delete(
        &self,
        conn: &mut dyn SqlConnection,
        table_prefix: &str,
        link_id: i64,
        type_tags: &[i32],
    ) -> Result<()> {
        self.layout
            .delete(conn, &self.table_name(table_prefix), link_id, type_tags)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{TextCodec, with_logical_name};
    use crate::layout::MinimalLayout;

    #[test]
    fn test_table_name_joins_prefix_and_logical_name() {
        let handler = LayoutTypeHandler::new(Arc::new(MinimalLayout::new()), Arc::new(TextCodec));
        assert_eq!(handler.table_name("transfer"), "transferString");
    }

    #[test]
    fn test_table_name_follows_renamed_codec() {
        let codec = with_logical_name(Arc::new(TextCodec), "Description");
        let handler = LayoutTypeHandler::new(Arc::new(MinimalLayout::new()), codec);
        assert_eq!(handler.table_name("transfer"), "transferDescription");
    }
}
