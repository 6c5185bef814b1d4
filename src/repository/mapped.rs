use crate::core::{AttributeKey, Entity, Result};
use crate::repository::Repository;
use std::marker::PhantomData;

/// Conversion between a domain value and its attribute-set form.
pub trait EntityMapper<T, K: AttributeKey>: Send + Sync {
    fn to_entity(&self, value: &T) -> Entity<K>;

    fn from_entity(&self, entity: Entity<K>) -> Result<T>;
}

/// Typed façade over a [`Repository`]: callers see their domain type, the
/// mapper handles the attribute plumbing.
pub struct MappedRepository<T, K: AttributeKey, M: EntityMapper<T, K>> {
    repository: Repository<K>,
    mapper: M,
    _value: PhantomData<fn() -> T>,
}

impl<T, K: AttributeKey, M: EntityMapper<T, K>> MappedRepository<T, K, M> {
    pub fn new(repository: Repository<K>, mapper: M) -> Self {
        Self {
            repository,
            mapper,
            _value: PhantomData,
        }
    }

    /// The domain value stored under the id, or `None` when no attribute
    /// rows exist for it.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<T>> {
        let values = self.repository.find_by_id(id).await?;
        if values.is_empty() {
            return Ok(None);
        }
        self.mapper.from_entity(Entity::new(id, values)).map(Some)
    }

    pub async fn store(&self, value: &T) -> Result<()> {
        let entity = self.mapper.to_entity(value);
        self.repository.store(entity.id(), entity.values()).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.repository.delete_all(id).await
    }
}
