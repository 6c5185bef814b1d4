use crate::backend::SqlConnection;
use crate::core::key::reverse_tag_map;
use crate::core::{AttrValues, AttributeKey, Result, ValueType};
use crate::registry::TypeHandlerRegistry;
use crate::repository::{
    dedup_ids, dedup_keys, group_keys, group_values, merge_rows, resolve_handlers, tag_values,
    tags_of,
};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

/// Repository over a caller-owned connection.
///
/// Every operation takes the connection explicitly, so the caller can batch
/// several entities — possibly spanning several key sets — inside one
/// transaction and decide when to commit or roll back. No connections are
/// acquired and nothing runs concurrently.
pub struct TransactionalRepository<K: AttributeKey> {
    registry: Arc<TypeHandlerRegistry>,
    table_prefix: String,
    _key: PhantomData<fn() -> K>,
}

impl<K: AttributeKey> TransactionalRepository<K> {
    pub fn new(registry: Arc<TypeHandlerRegistry>, table_prefix: impl Into<String>) -> Self {
        Self {
            registry,
            table_prefix: table_prefix.into(),
            _key: PhantomData,
        }
    }

    pub async fn find_by_id(
        &self,
        conn: &mut dyn SqlConnection,
        id: i64,
    ) -> Result<AttrValues<K>> {
        let mut found = self.find_by_ids(conn, &[id]).await?;
        Ok(found.remove(&id).unwrap_or_default())
    }

    pub async fn find_by_id_partial(
        &self,
        conn: &mut dyn SqlConnection,
        id: i64,
        keys: &[K],
    ) -> Result<AttrValues<K>> {
        let mut found = self.find_by_ids_partial(conn, &[id], keys).await?;
        Ok(found.remove(&id).unwrap_or_default())
    }

    pub async fn find_by_ids(
        &self,
        conn: &mut dyn SqlConnection,
        ids: &[i64],
    ) -> Result<HashMap<i64, AttrValues<K>>> {
        self.find(conn, ids, group_keys(K::all())).await
    }

    pub async fn find_by_ids_partial(
        &self,
        conn: &mut dyn SqlConnection,
        ids: &[i64],
        keys: &[K],
    ) -> Result<HashMap<i64, AttrValues<K>>> {
        self.find(conn, ids, group_keys(&dedup_keys(keys))).await
    }

    async fn find(
        &self,
        conn: &mut dyn SqlConnection,
        ids: &[i64],
        grouped: BTreeMap<ValueType, Vec<K>>,
    ) -> Result<HashMap<i64, AttrValues<K>>> {
        if ids.is_empty() || grouped.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = dedup_ids(ids);
        let resolved = resolve_handlers(&self.registry, grouped)?;

        let mut combined = HashMap::new();
        for (_, handler, keys) in &resolved {
            let rows = handler
                .find_by_link_id(conn, &self.table_prefix, &ids, &tags_of(keys))
                .await?;
            merge_rows(rows, &reverse_tag_map(keys), &mut combined);
        }
        Ok(combined)
    }

    pub async fn store(
        &self,
        conn: &mut dyn SqlConnection,
        id: i64,
        values: &AttrValues<K>,
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let resolved = resolve_handlers(&self.registry, group_values(values))?;
        for (_, handler, pairs) in &resolved {
            handler
                .store(conn, &self.table_prefix, id, &tag_values(pairs))
                .await?;
        }
        Ok(())
    }

    pub async fn delete(
        &self,
        conn: &mut dyn SqlConnection,
        id: i64,
        keys: &[K],
    ) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys = dedup_keys(keys);
        let resolved = resolve_handlers(&self.registry, group_keys(&keys))?;
        for (_, handler, keys) in &resolved {
            handler
                .delete(conn, &self.table_prefix, id, &tags_of(keys))
                .await?;
        }
        Ok(())
    }

    pub async fn delete_all(&self, conn: &mut dyn SqlConnection, id: i64) -> Result<()> {
        self.delete(conn, id, K::all()).await
    }
}
