//! SQL assembly shared by the stock layouts.

use crate::codec::ValueCodec;
use crate::core::{AttrError, Result, Row, SqlValue};
use crate::layout::{StoredRow, escape_name, placeholders};

/// `SELECT link,tag,<value cols> FROM table WHERE [extra AND] link IN (..) AND tag IN (..)`.
pub(crate) fn build_select(
    table_name: &str,
    column_link_id: &str,
    column_type_tag: &str,
    value_columns: &[&str],
    id_count: usize,
    tag_count: usize,
    extra_where: Option<&str>,
    row_locking: bool,
) -> Result<String> {
    let link = escape_name(column_link_id)?;
    let tag = escape_name(column_type_tag)?;

    let mut sql = format!("SELECT {link},{tag}");
    for column in value_columns {
        sql.push(',');
        sql.push_str(&escape_name(column)?);
    }
    sql.push_str(" FROM ");
    sql.push_str(&escape_name(table_name)?);
    sql.push_str(" WHERE ");
    if let Some(extra) = extra_where {
        sql.push_str(extra);
        sql.push_str(" AND ");
    }
    sql.push_str(&format!("{link} IN ({})", placeholders(id_count)));
    sql.push_str(&format!(" AND {tag} IN ({})", placeholders(tag_count)));
    if row_locking {
        sql.push_str(" FOR UPDATE");
    }
    Ok(sql)
}

pub(crate) fn select_params(link_ids: &[i64], type_tags: &[i32]) -> Vec<SqlValue> {
    link_ids
        .iter()
        .map(|id| SqlValue::Integer(*id))
        .chain(type_tags.iter().map(|tag| SqlValue::Integer(*tag as i64)))
        .collect()
}

/// Turns raw result rows into [`StoredRow`]s: column 0 is the link id,
/// column 1 the type tag, the remainder belongs to the codec.
pub(crate) fn decode_rows(codec: &dyn ValueCodec, rows: &[Row]) -> Result<Vec<StoredRow>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() < 2 {
            return Err(AttrError::backend_msg("attribute row with too few columns"));
        }
        let link_id = row[0]
            .as_i64()
            .ok_or_else(|| AttrError::backend_msg("non-integer link id column"))?;
        let type_tag = row[1]
            .as_i64()
            .ok_or_else(|| AttrError::backend_msg("non-integer type tag column"))?;
        out.push(StoredRow {
            link_id,
            type_tag: type_tag as i32,
            value: codec.decode(&row[2..])?,
        });
    }
    Ok(out)
}

/// `INSERT INTO table (link,tag,<extra>,<value cols>) VALUES (..),(..)`.
pub(crate) fn build_insert(
    table_name: &str,
    column_link_id: &str,
    column_type_tag: &str,
    extra_columns: &[&str],
    value_columns: &[&str],
    row_count: usize,
) -> Result<String> {
    let mut sql = format!("INSERT INTO {}", escape_name(table_name)?);
    sql.push_str(" (");
    sql.push_str(&escape_name(column_link_id)?);
    sql.push(',');
    sql.push_str(&escape_name(column_type_tag)?);
    for column in extra_columns.iter().chain(value_columns) {
        sql.push(',');
        sql.push_str(&escape_name(column)?);
    }
    sql.push_str(") VALUES ");

    let row = format!("({})", placeholders(2 + extra_columns.len() + value_columns.len()));
    for i in 0..row_count {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(&row);
    }
    Ok(sql)
}

/// ` WHERE link = ? AND tag IN (..)` suffix for delete statements.
pub(crate) fn build_delete_where(
    column_link_id: &str,
    column_type_tag: &str,
    tag_count: usize,
) -> Result<String> {
    Ok(format!(
        " WHERE {} = ? AND {} IN ({})",
        escape_name(column_link_id)?,
        escape_name(column_type_tag)?,
        placeholders(tag_count)
    ))
}

pub(crate) fn delete_params(link_id: i64, type_tags: &[i32]) -> Vec<SqlValue> {
    std::iter::once(SqlValue::Integer(link_id))
        .chain(type_tags.iter().map(|tag| SqlValue::Integer(*tag as i64)))
        .collect()
}
