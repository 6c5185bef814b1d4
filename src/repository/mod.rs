//! Repositories: the public read/write/delete surface.
//!
//! All variants share the same shape of work: de-duplicate the input, group
//! it by value type, resolve every handler up front (an unregistered type
//! fails the whole operation before any I/O), dispatch per type, and merge
//! the per-type results. They differ only in how connections are obtained
//! and whether the per-type dispatch runs sequentially, in parallel, or on a
//! caller-owned transaction.

mod mapped;
mod parallel;
mod transactional;

pub use mapped::{EntityMapper, MappedRepository};
pub use parallel::ParallelRepository;
pub use transactional::TransactionalRepository;

use crate::backend::ConnectionProvider;
use crate::core::key::reverse_tag_map;
use crate::core::{AttrValues, AttributeKey, Result, Value, ValueType};
use crate::handler::TypeHandler;
use crate::layout::StoredRow;
use crate::registry::TypeHandlerRegistry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Order-preserving de-duplication of entity ids.
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Order-preserving de-duplication of keys.
pub(crate) fn dedup_keys<K: AttributeKey>(keys: &[K]) -> Vec<K> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().copied().filter(|key| seen.insert(*key)).collect()
}

/// Partitions keys by their value type. Value type is the sole criterion, so
/// ties cannot occur; the map is ordered for deterministic dispatch order.
pub(crate) fn group_keys<K: AttributeKey>(keys: &[K]) -> BTreeMap<ValueType, Vec<K>> {
    let mut grouped: BTreeMap<ValueType, Vec<K>> = BTreeMap::new();
    for key in keys {
        grouped.entry(key.value_type()).or_default().push(*key);
    }
    grouped
}

/// Partitions key/value pairs by the key's value type.
pub(crate) fn group_values<K: AttributeKey>(
    values: &AttrValues<K>,
) -> BTreeMap<ValueType, Vec<(K, Vec<Value>)>> {
    let mut grouped: BTreeMap<ValueType, Vec<(K, Vec<Value>)>> = BTreeMap::new();
    for (key, list) in values {
        grouped
            .entry(key.value_type())
            .or_default()
            .push((*key, list.clone()));
    }
    grouped
}

/// Resolves the handler of every group before any I/O happens.
pub(crate) fn resolve_handlers<G>(
    registry: &TypeHandlerRegistry,
    grouped: BTreeMap<ValueType, G>,
) -> Result<Vec<(ValueType, Arc<dyn TypeHandler>, G)>> {
    let mut resolved = Vec::with_capacity(grouped.len());
    for (value_type, group) in grouped {
        let handler = registry.resolve(value_type)?;
        resolved.push((value_type, handler, group));
    }
    Ok(resolved)
}

pub(crate) fn tags_of<K: AttributeKey>(keys: &[K]) -> Vec<i32> {
    keys.iter().map(|key| key.type_tag()).collect()
}

pub(crate) fn tag_values<K: AttributeKey>(pairs: &[(K, Vec<Value>)]) -> Vec<(i32, Vec<Value>)> {
    pairs
        .iter()
        .map(|(key, list)| (key.type_tag(), list.clone()))
        .collect()
}

/// Folds handler rows into the combined per-entity result. Rows whose tag is
/// not in the reverse map (stale or foreign rows sharing the table) are
/// silently skipped.
pub(crate) fn merge_rows<K: AttributeKey>(
    rows: Vec<StoredRow>,
    reverse: &HashMap<i32, K>,
    combined: &mut HashMap<i64, AttrValues<K>>,
) {
    for row in rows {
        let Some(key) = reverse.get(&row.type_tag) else {
            continue;
        };
        combined
            .entry(row.link_id)
            .or_default()
            .entry(*key)
            .or_default()
            .push(row.value);
    }
}

/// Sequential repository: one connection per operation, handlers invoked one
/// after another on it.
///
/// A failure midway through a multi-type store leaves the earlier types
/// already persisted — there is no implicit rollback unless the supplied
/// provider hands out transactional connections.
pub struct Repository<K: AttributeKey> {
    provider: Arc<dyn ConnectionProvider>,
    registry: Arc<TypeHandlerRegistry>,
    table_prefix: String,
    _key: PhantomData<fn() -> K>,
}

impl<K: AttributeKey> Repository<K> {
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        registry: Arc<TypeHandlerRegistry>,
        table_prefix: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            table_prefix: table_prefix.into(),
            _key: PhantomData,
        }
    }

    /// Verifies that a connection can be acquired.
    pub async fn ping(&self) -> Result<()> {
        let _conn = self.provider.connection().await?;
        Ok(())
    }

    /// Every declared key of one entity. Empty map when nothing is stored.
    pub async fn find_by_id(&self, id: i64) -> Result<AttrValues<K>> {
        let mut found = self.find_by_ids(&[id]).await?;
        Ok(found.remove(&id).unwrap_or_default())
    }

    /// Requested keys of one entity.
    pub async fn find_by_id_partial(&self, id: i64, keys: &[K]) -> Result<AttrValues<K>> {
        let mut found = self.find_by_ids_partial(&[id], keys).await?;
        Ok(found.remove(&id).unwrap_or_default())
    }

    /// Every declared key of several entities. Entities without rows are
    /// absent from the result.
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, AttrValues<K>>> {
        self.find(ids, group_keys(K::all())).await
    }

    /// Requested keys of several entities.
    pub async fn find_by_ids_partial(
        &self,
        ids: &[i64],
        keys: &[K],
    ) -> Result<HashMap<i64, AttrValues<K>>> {
        self.find(ids, group_keys(&dedup_keys(keys))).await
    }

    async fn find(
        &self,
        ids: &[i64],
        grouped: BTreeMap<ValueType, Vec<K>>,
    ) -> Result<HashMap<i64, AttrValues<K>>> {
        if ids.is_empty() || grouped.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = dedup_ids(ids);
        let resolved = resolve_handlers(&self.registry, grouped)?;

        let mut conn = self.provider.connection().await?;
        let mut combined = HashMap::new();
        for (_, handler, keys) in &resolved {
            let rows = handler
                .find_by_link_id(conn.as_mut(), &self.table_prefix, &ids, &tags_of(keys))
                .await?;
            merge_rows(rows, &reverse_tag_map(keys), &mut combined);
        }
        Ok(combined)
    }

    /// Replaces the given keys of one entity. A key mapped to an empty list
    /// is cleared; an empty map is a no-op.
    pub async fn store(&self, id: i64, values: &AttrValues<K>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let resolved = resolve_handlers(&self.registry, group_values(values))?;
        debug!(link_id = id, groups = resolved.len(), "storing attributes");

        let mut conn = self.provider.connection().await?;
        for (_, handler, pairs) in &resolved {
            handler
                .store(conn.as_mut(), &self.table_prefix, id, &tag_values(pairs))
                .await?;
        }
        Ok(())
    }

    /// Deletes the given keys of one entity. Unknown keys are a no-op; an
    /// empty key set never reaches the backend.
    pub async fn delete(&self, id: i64, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys = dedup_keys(keys);
        let resolved = resolve_handlers(&self.registry, group_keys(&keys))?;
        debug!(link_id = id, groups = resolved.len(), "deleting attributes");

        let mut conn = self.provider.connection().await?;
        for (_, handler, keys) in &resolved {
            handler
                .delete(conn.as_mut(), &self.table_prefix, id, &tags_of(keys))
                .await?;
        }
        Ok(())
    }

    /// Deletes every declared key of one entity.
    pub async fn delete_all(&self, id: i64) -> Result<()> {
        self.delete(id, K::all()).await
    }
}
