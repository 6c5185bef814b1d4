use crate::core::key::{AttrValues, AttributeKey};
use crate::core::value::Value;

/// Typed envelope around one entity's attribute values.
///
/// The identifier is always caller-supplied; this engine generates no ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<K: AttributeKey> {
    id: i64,
    values: AttrValues<K>,
}

impl<K: AttributeKey> Entity<K> {
    pub fn new(id: i64, values: AttrValues<K>) -> Self {
        Self { id, values }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn values(&self) -> &AttrValues<K> {
        &self.values
    }

    pub fn into_values(self) -> AttrValues<K> {
        self.values
    }

    /// First value stored under the key, for the common single-valued case.
    pub fn single(&self, key: K) -> Option<&Value> {
        self.values.get(&key).and_then(|list| list.first())
    }

    /// True when no key holds any value.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(|list| list.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ValueType;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum K {
        Name,
    }

    impl AttributeKey for K {
        fn type_tag(&self) -> i32 {
            1
        }

        fn value_type(&self) -> ValueType {
            ValueType::Text
        }

        fn all() -> &'static [Self] {
            &[K::Name]
        }
    }

    #[test]
    fn test_single_returns_first_value() {
        let mut values: AttrValues<K> = HashMap::new();
        values.insert(K::Name, vec![Value::Text("a".into()), Value::Text("b".into())]);
        let entity = Entity::new(7, values);

        assert_eq!(entity.id(), 7);
        assert_eq!(entity.single(K::Name), Some(&Value::Text("a".into())));
        assert!(!entity.is_empty());
    }

    #[test]
    fn test_empty_entity() {
        let entity: Entity<K> = Entity::new(7, HashMap::new());
        assert!(entity.is_empty());
        assert_eq!(entity.single(K::Name), None);
    }
}
