//! Reconciliation of a proposed attribute set against rows already on disk.
//!
//! Lets a layout minimize write volume instead of naively replacing every
//! row. Pure computation, no I/O; not wired into the stock layouts.

use std::collections::HashMap;
use std::hash::Hash;

/// One physical row already stored, as opposed to the logical key/value pair
/// being proposed for write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue<Id, K, V> {
    id: Id,
    key: K,
    value: V,
}

impl<Id, K, V> StoredValue<Id, K, V> {
    pub fn new(id: Id, key: K, value: V) -> Self {
        Self { id, key, value }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

/// Computes the difference between values to store and values already in the
/// database: what must be inserted, which row ids can be retired, and which
/// rows need no touch at all.
///
/// Equality is value equality. Only keys present in the proposed set are
/// examined; stored rows of other keys are left alone. Value lists are small,
/// so comparisons are linear scans.
pub struct ChangesDetector<Id, K, V> {
    values_to_store: Vec<(K, Vec<V>)>,
    stored_by_key: HashMap<K, Vec<(Id, V)>>,
}

impl<Id, K, V> ChangesDetector<Id, K, V>
where
    Id: Clone + Eq + Hash,
    K: Clone + Eq + Hash,
    V: Clone + PartialEq,
{
    pub fn new(
        values_to_store: Vec<(K, Vec<V>)>,
        values_from_database: Vec<StoredValue<Id, K, V>>,
    ) -> Self {
        let mut stored_by_key: HashMap<K, Vec<(Id, V)>> = HashMap::new();
        for stored in values_from_database {
            stored_by_key
                .entry(stored.key)
                .or_default()
                .push((stored.id, stored.value));
        }
        Self {
            values_to_store,
            stored_by_key,
        }
    }

    /// Proposed values with no equal counterpart among the stored rows of
    /// their key, in original per-key order. Keys with nothing new are
    /// omitted.
    pub fn values_to_insert(&self) -> Vec<(K, Vec<V>)> {
        let mut response = Vec::new();
        for (key, proposed) in &self.values_to_store {
            let stored = self.stored_by_key.get(key);
            let fresh: Vec<V> = proposed
                .iter()
                .filter(|value| {
                    stored
                        .map(|rows| !rows.iter().any(|(_, v)| v == *value))
                        .unwrap_or(true)
                })
                .cloned()
                .collect();
            if !fresh.is_empty() {
                response.push((key.clone(), fresh));
            }
        }
        response
    }

    /// Ids of stored rows whose value is absent from the proposed set of
    /// their key - candidates for retirement. First-seen order, de-duplicated.
    pub fn ids_to_delete(&self) -> Vec<Id> {
        self.partition_stored(|present| !present)
    }

    /// Ids of stored rows whose value is present in the proposed set of
    /// their key - rows that need no write at all.
    pub fn ids_intact(&self) -> Vec<Id> {
        self.partition_stored(|present| present)
    }

    fn partition_stored(&self, keep: impl Fn(bool) -> bool) -> Vec<Id> {
        let mut response = Vec::new();
        for (key, proposed) in &self.values_to_store {
            let Some(rows) = self.stored_by_key.get(key) else {
                continue;
            };
            for (id, value) in rows {
                let present = proposed.contains(value);
                if keep(present) && !response.contains(id) {
                    response.push(id.clone());
                }
            }
        }
        response
    }
}
