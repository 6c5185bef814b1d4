use crate::core::value::{Value, ValueType};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Descriptor of one logical attribute.
///
/// Implemented by a closed enum per entity kind. The tag is the only
/// identifier that reaches disk — it must stay unique within the key set and
/// stable across deployments. Key names never persist.
pub trait AttributeKey: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable integer identifier stored alongside every row of this key.
    fn type_tag(&self) -> i32;

    /// The value type this key carries; selects the storage strategy.
    fn value_type(&self) -> ValueType;

    /// Every declared key of the enclosing entity kind. Full reads and full
    /// deletes expand to this set.
    fn all() -> &'static [Self];
}

/// Attribute values of one entity, a list per key.
///
/// An empty list is equivalent to absence: storing it clears the key and
/// nothing is inserted.
pub type AttrValues<K> = HashMap<K, Vec<Value>>;

/// Builds the tag-to-key translation used when turning backend rows back
/// into caller-level keys. Rows carrying a tag outside this map are skipped.
pub fn reverse_tag_map<K: AttributeKey>(keys: &[K]) -> HashMap<i32, K> {
    keys.iter().map(|k| (k.type_tag(), *k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum K {
        A,
        B,
    }

    impl AttributeKey for K {
        fn type_tag(&self) -> i32 {
            match self {
                K::A => 10,
                K::B => 20,
            }
        }

        fn value_type(&self) -> ValueType {
            ValueType::Long
        }

        fn all() -> &'static [Self] {
            &[K::A, K::B]
        }
    }

    #[test]
    fn test_reverse_tag_map() {
        let map = reverse_tag_map(&[K::A, K::B]);
        assert_eq!(map.get(&10), Some(&K::A));
        assert_eq!(map.get(&20), Some(&K::B));
        assert_eq!(map.get(&30), None);
    }
}
