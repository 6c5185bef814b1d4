use crate::backend::ConnectionProvider;
use crate::core::key::reverse_tag_map;
use crate::core::{AttrError, AttrValues, AttributeKey, Result, ValueType};
use crate::registry::TypeHandlerRegistry;
use crate::repository::{
    dedup_ids, dedup_keys, group_keys, group_values, merge_rows, resolve_handlers, tag_values,
    tags_of,
};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// Fan-out repository: each value-type partition runs as its own task on its
/// own connection.
///
/// The call waits for every task. On the first failure the remaining tasks
/// are cancelled best-effort (work already submitted to the backend is not
/// interrupted) and the failure propagates. Committed per-type writes are
/// **not** compensated: a failed multi-type store can leave some value-type
/// tables updated and others not. Callers needing cross-type atomicity
/// should batch through [`TransactionalRepository`](crate::TransactionalRepository).
pub struct ParallelRepository<K: AttributeKey> {
    provider: Arc<dyn ConnectionProvider>,
    registry: Arc<TypeHandlerRegistry>,
    table_prefix: Arc<String>,
    _key: PhantomData<fn() -> K>,
}

impl<K: AttributeKey> ParallelRepository<K> {
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        registry: Arc<TypeHandlerRegistry>,
        table_prefix: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            table_prefix: Arc::new(table_prefix.into()),
            _key: PhantomData,
        }
    }

    /// Verifies that a connection can be acquired.
    pub async fn ping(&self) -> Result<()> {
        let _conn = self.provider.connection().await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<AttrValues<K>> {
        let mut found = self.find_by_ids(&[id]).await?;
        Ok(found.remove(&id).unwrap_or_default())
    }

    pub async fn find_by_id_partial(&self, id: i64, keys: &[K]) -> Result<AttrValues<K>> {
        let mut found = self.find_by_ids_partial(&[id], keys).await?;
        Ok(found.remove(&id).unwrap_or_default())
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, AttrValues<K>>> {
        self.find(ids, group_keys(K::all())).await
    }

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
        let ids = Arc::new(dedup_ids(ids));
        let resolved = resolve_handlers(&self.registry, grouped)?;

        let mut tasks: JoinSet<Result<(Vec<K>, Vec<crate::layout::StoredRow>)>> = JoinSet::new();
        for (_, handler, keys) in resolved {
            let provider = Arc::clone(&self.provider);
            let prefix = Arc::clone(&self.table_prefix);
            let ids = Arc::clone(&ids);
            tasks.spawn(async move {
                let mut conn = provider.connection().await?;
                let rows = handler
                    .find_by_link_id(conn.as_mut(), &prefix, &ids, &tags_of(&keys))
                    .await?;
                Ok((keys, rows))
            });
        }

        let parts = join_all(tasks).await?;
        let mut combined = HashMap::new();
        for (keys, rows) in parts {
            merge_rows(rows, &reverse_tag_map(&keys), &mut combined);
        }
        Ok(combined)
    }

    /// Replaces the given keys of one entity, one task per value type.
    /// Not atomic across value types; see the type-level docs.
    pub async fn store(&self, id: i64, values: &AttrValues<K>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let resolved = resolve_handlers(&self.registry, group_values(values))?;
        debug!(link_id = id, tasks = resolved.len(), "storing attributes in parallel");

        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        for (_, handler, pairs) in resolved {
            let provider = Arc::clone(&self.provider);
            let prefix = Arc::clone(&self.table_prefix);
            let values = tag_values(&pairs);
            tasks.spawn(async move {
                let mut conn = provider.connection().await?;
                handler.store(conn.as_mut(), &prefix, id, &values).await
            });
        }

        join_all(tasks).await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys = dedup_keys(keys);
        let resolved = resolve_handlers(&self.registry, group_keys(&keys))?;
        debug!(link_id = id, tasks = resolved.len(), "deleting attributes in parallel");

        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        for (_, handler, keys) in resolved {
            let provider = Arc::clone(&self.provider);
            let prefix = Arc::clone(&self.table_prefix);
            tasks.spawn(async move {
                let mut conn = provider.connection().await?;
                handler.delete(conn.as_mut(), &prefix, id, &tags_of(&keys)).await
            });
        }

        join_all(tasks).await?;
        Ok(())
    }

    pub async fn delete_all(&self, id: i64) -> Result<()> {
        self.delete(id, K::all()).await
    }
}

/// Waits for every task; on the first failure aborts whatever has not run
/// yet and propagates that failure alone.
async fn join_all<T: 'static>(mut tasks: JoinSet<Result<T>>) -> Result<Vec<T>> {
    let mut parts = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(part)) => parts.push(part),
            Ok(Err(err)) => {
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return Err(err);
            }
            Err(join_err) => {
                if join_err.is_cancelled() {
                    continue;
                }
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return Err(AttrError::backend(join_err));
            }
        }
    }
    Ok(parts)
}
