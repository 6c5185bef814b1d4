use crate::backend::SqlConnection;
use crate::codec::ValueCodec;
use crate::core::{Result, SqlValue, Value};
use crate::layout::common;
use crate::layout::{StoredRow, TableLayout};
use async_trait::async_trait;
use tracing::debug;

/// Smallest possible table shape: `(linkId, typeTag, <value columns>)`.
///
/// Stores by deleting the prior rows of every touched tag and bulk-inserting
/// the replacements; deletes are hard deletes. No history is kept.
pub struct MinimalLayout {
    column_link_id: String,
    column_type_tag: String,
    row_locking: bool,
}

impl MinimalLayout {
    pub fn new() -> Self {
        Self {
            column_link_id: "linkId".to_string(),
            column_type_tag: "typeId".to_string(),
            row_locking: false,
        }
    }

    /// Overrides the link and tag column names.
    pub fn with_columns(mut self, link_id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        self.column_link_id = link_id.into();
        self.column_type_tag = type_tag.into();
        self
    }

    /// When enabled, reads executed inside an open transaction append a
    /// `FOR UPDATE` clause so later writes in the same transaction see
    /// locked rows.
    pub fn with_row_locking(mut self, row_locking: bool) -> Self {
        self.row_locking = row_locking;
        self
    }

    fn lock_rows(&self, conn: &dyn SqlConnection) -> bool {
        self.row_locking && conn.in_transaction()
    }
}

impl Default for MinimalLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableLayout for MinimalLayout {
    async fn find_by_link_id(
        &self,
        codec: &dyn ValueCodec,
        conn: &mut dyn SqlConnection,
        table_name: &str,
        link_ids: &[i64],
        type_tags: &[i32],
    ) -> Result<Vec<StoredRow>> {
        if link_ids.is_empty() || type_tags.is_empty() {
            return Ok(Vec::new());
        }

        let sql = common::build_select(
            table_name,
            &self.column_link_id,
            &self.column_type_tag,
            codec.column_names(),
            link_ids.len(),
            type_tags.len(),
            None,
            self.lock_rows(conn),
        )?;
        let rows = conn.query(&sql, &common::select_params(link_ids, type_tags)).await?;
        debug!(table = table_name, rows = rows.len(), "fetched attribute rows");
        common::decode_rows(codec, &rows)
    }

    async fn store(
        &self,
        codec: &dyn ValueCodec,
        conn: &mut dyn SqlConnection,
        table_name: &str,
        link_id: i64,
        values: &[(i32, Vec<Value>)],
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        // Retire prior rows for every touched tag, including tags whose new
        // value list is empty - that is how clearing by omission works.
        let touched: Vec<i32> = values.iter().map(|(tag, _)| *tag).collect();
        self.delete(conn, table_name, link_id, &touched).await?;

        let row_count: usize = values.iter().map(|(_, list)| list.len()).sum();
        if row_count == 0 {
            return Ok(());
        }

        let sql = common::build_insert(
            table_name,
            &self.column_link_id,
            &self.column_type_tag,
            &[],
            codec.column_names(),
            row_count,
        )?;

        let mut params = Vec::with_capacity(row_count * (2 + codec.column_names().len()));
        for (tag, list) in values {
            for value in list {
                params.push(SqlValue::Integer(link_id));
                params.push(SqlValue::Integer(*tag as i64));
                params.extend(codec.bind(value)?);
            }
        }

        conn.execute(&sql, &params).await?;
        debug!(table = table_name, rows = row_count, "stored attribute rows");
        Ok(())
    }

    async fn delete(
        &self,
        conn: &mut dyn SqlConnection,
        table_name: &str,
        link_id: i64,
        type_tags: &[i32],
    ) -> Result<()> {
        if type_tags.is_empty() {
            return Ok(());
        }

        let mut sql = format!("DELETE FROM {}", crate::layout::escape_name(table_name)?);
        sql.push_str(&common::build_delete_where(
            &self.column_link_id,
            &self.column_type_tag,
            type_tags.len(),
        )?);

        conn.execute(&sql, &common::delete_params(link_id, type_tags)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LongCodec, TextCodec};
    use crate::layout::test_support::RecordingConnection;

    #[tokio::test]
    async fn test_find_builds_single_in_query() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new();

        layout
            .find_by_link_id(&TextCodec, &mut conn, "tString", &[1, 2], &[10, 20, 30])
            .await
            .unwrap();

        assert_eq!(
            conn.last_sql(),
            "SELECT `linkId`,`typeId`,`value` FROM `tString` \
             WHERE `linkId` IN (?,?) AND `typeId` IN (?,?,?)"
        );
        let params = &conn.statements[0].1;
        assert_eq!(params[0], SqlValue::Integer(1));
        assert_eq!(params[2], SqlValue::Integer(10));
        assert_eq!(params.len(), 5);
    }

    #[tokio::test]
    async fn test_find_decodes_rows_in_result_order() {
        let mut conn = RecordingConnection::with_rows(vec![
            vec![SqlValue::Integer(1), SqlValue::Integer(10), SqlValue::Text("a".into())],
            vec![SqlValue::Integer(1), SqlValue::Integer(10), SqlValue::Text("b".into())],
        ]);
        let layout = MinimalLayout::new();

        let rows = layout
            .find_by_link_id(&TextCodec, &mut conn, "tString", &[1], &[10])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, Value::Text("a".into()));
        assert_eq!(rows[1].value, Value::Text("b".into()));
        assert_eq!(rows[0].link_id, 1);
        assert_eq!(rows[0].type_tag, 10);
    }

    #[tokio::test]
    async fn test_find_appends_for_update_inside_transaction() {
        let mut conn = RecordingConnection::new();
        conn.in_tx = true;
        let layout = MinimalLayout::new().with_row_locking(true);

        layout
            .find_by_link_id(&LongCodec, &mut conn, "tLong", &[1], &[10])
            .await
            .unwrap();

        assert!(conn.last_sql().ends_with(" FOR UPDATE"));
    }

    #[tokio::test]
    async fn test_find_without_locking_flag_never_locks() {
        let mut conn = RecordingConnection::new();
        conn.in_tx = true;
        let layout = MinimalLayout::new();

        layout
            .find_by_link_id(&LongCodec, &mut conn, "tLong", &[1], &[10])
            .await
            .unwrap();

        assert!(!conn.last_sql().contains("FOR UPDATE"));
    }

    #[tokio::test]
    async fn test_find_empty_inputs_skip_backend() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new();

        let rows = layout
            .find_by_link_id(&LongCodec, &mut conn, "tLong", &[], &[10])
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert!(conn.statements.is_empty());
    }

    #[tokio::test]
    async fn test_store_deletes_then_inserts() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new();

        layout
            .store(
                &TextCodec,
                &mut conn,
                "tString",
                5,
                &[
                    (10, vec![Value::Text("a".into()), Value::Text("b".into())]),
                    (20, vec![Value::Text("c".into())]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(conn.statements.len(), 2);
        assert_eq!(
            conn.statements[0].0,
            "DELETE FROM `tString` WHERE `linkId` = ? AND `typeId` IN (?,?)"
        );
        assert_eq!(
            conn.statements[1].0,
            "INSERT INTO `tString` (`linkId`,`typeId`,`value`) VALUES (?,?,?),(?,?,?),(?,?,?)"
        );
        // 3 rows x (link, tag, value)
        assert_eq!(conn.statements[1].1.len(), 9);
    }

    #[tokio::test]
    async fn test_store_empty_list_only_clears() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new();

        layout
            .store(&TextCodec, &mut conn, "tString", 5, &[(10, vec![])])
            .await
            .unwrap();

        assert_eq!(conn.statements.len(), 1);
        assert!(conn.statements[0].0.starts_with("DELETE FROM"));
    }

    #[tokio::test]
    async fn test_delete_empty_tags_is_noop() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new();

        layout.delete(&mut conn, "tString", 5, &[]).await.unwrap();
        assert!(conn.statements.is_empty());
    }

    #[tokio::test]
    async fn test_custom_columns() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new().with_columns("owner", "attr");

        layout.delete(&mut conn, "tString", 5, &[10]).await.unwrap();
        assert_eq!(
            conn.last_sql(),
            "DELETE FROM `tString` WHERE `owner` = ? AND `attr` IN (?)"
        );
    }

    #[tokio::test]
    async fn test_invalid_table_name_fails() {
        let mut conn = RecordingConnection::new();
        let layout = MinimalLayout::new();

        let err = layout
            .delete(&mut conn, "bad`name", 5, &[10])
            .await
            .unwrap_err();
        assert!(matches!(err, crate::core::AttrError::InvalidIdentifier(_)));
        assert!(conn.statements.is_empty());
    }
}
