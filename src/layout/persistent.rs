use crate::backend::SqlConnection;
use crate::codec::ValueCodec;
use crate::core::{Result, SqlValue, Value};
use crate::layout::common;
use crate::layout::{StoredRow, TableLayout, escape_name};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

const COLUMN_ACTIVE: &str = "active";
const COLUMN_CREATED_AT: &str = "createdAt";

/// History-keeping table shape:
/// `(linkId, typeTag, active, createdAt, <value columns>)`.
///
/// Nothing is ever physically deleted. Storing marks the prior rows of each
/// touched tag inactive and inserts replacements stamped `active=1` with a
/// creation time in epoch seconds; reads filter on `active=1`. Rows grow
/// without bound - the price of an audit trail of every value a key has held.
pub struct PersistentLayout {
    column_link_id: String,
    column_type_tag: String,
    row_locking: bool,
}

impl PersistentLayout {
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
    /// `FOR UPDATE` clause.
    pub fn with_row_locking(mut self, row_locking: bool) -> Self {
        self.row_locking = row_locking;
        self
    }

    fn lock_rows(&self, conn: &dyn SqlConnection) -> bool {
        self.row_locking && conn.in_transaction()
    }

    fn active_filter(&self) -> Result<String> {
        Ok(format!("{} = 1", escape_name(COLUMN_ACTIVE)?))
    }
}

impl Default for PersistentLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableLayout for PersistentLayout {
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

        let filter = self.active_filter()?;
        let sql = common::build_select(
            table_name,
            &self.column_link_id,
            &self.column_type_tag,
            codec.column_names(),
            link_ids.len(),
            type_tags.len(),
            Some(&filter),
            self.lock_rows(conn),
        )?;
        let rows = conn.query(&sql, &common::select_params(link_ids, type_tags)).await?;
        debug!(table = table_name, rows = rows.len(), "fetched active attribute rows");
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
            &[COLUMN_ACTIVE, COLUMN_CREATED_AT],
            codec.column_names(),
            row_count,
        )?;

        let created_at = Utc::now().timestamp();
        let mut params = Vec::with_capacity(row_count * (4 + codec.column_names().len()));
        for (tag, list) in values {
            for value in list {
                params.push(SqlValue::Integer(link_id));
                params.push(SqlValue::Integer(*tag as i64));
                params.push(SqlValue::Integer(1));
                params.push(SqlValue::Integer(created_at));
                params.extend(codec.bind(value)?);
            }
        }

        conn.execute(&sql, &params).await?;
        debug!(table = table_name, rows = row_count, "stored attribute row versions");
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

        let mut sql = format!(
            "UPDATE {} SET {} = 0",
            escape_name(table_name)?,
            escape_name(COLUMN_ACTIVE)?
        );
        sql.push_str(&common::build_delete_where(
            &self.column_link_id,
            &self.column_type_tag,
            type_tags.len(),
        )?);

        conn.execute(&sql, &common::delete_params(link_id, type_tags)).await?;
        Ok(())
    }
}
