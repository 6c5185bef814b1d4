// ============================================================================
// attrstore - entity-attribute-value persistence engine
// ============================================================================

//! Stores heterogeneous, sparse, multi-valued attributes for numerically
//! identified entities inside a relational backend, one physical table per
//! value type instead of one table per entity kind.
//!
//! Attributes are described by [`AttributeKey`] implementations: a stable
//! integer tag plus the [`ValueType`] the key carries. Each value type is
//! served by a [`TypeHandler`] — a [`TableLayout`] (row shape + SQL behavior)
//! bound to a [`ValueCodec`](codec::ValueCodec) (value/placeholder conversion
//! and table naming) — registered in a [`TypeHandlerRegistry`]. Repositories
//! group a mixed attribute set by value type, resolve the handler for each
//! group, and merge the per-type results.
//!
//! # Examples
//!
//! ```no_run
//! use attrstore::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum NoteKey {
//!     Title,
//!     Views,
//! }
//!
//! impl AttributeKey for NoteKey {
//!     fn type_tag(&self) -> i32 {
//!         match self {
//!             NoteKey::Title => 1,
//!             NoteKey::Views => 2,
//!         }
//!     }
//!
//!     fn value_type(&self) -> ValueType {
//!         match self {
//!             NoteKey::Title => ValueType::Text,
//!             NoteKey::Views => ValueType::Long,
//!         }
//!     }
//!
//!     fn all() -> &'static [Self] {
//!         &[NoteKey::Title, NoteKey::Views]
//!     }
//! }
//!
//! # async fn run() -> attrstore::Result<()> {
//! let layout = Arc::new(MinimalLayout::new());
//! let registry = Arc::new(
//!     TypeHandlerRegistryBuilder::new()
//!         .with_layout(ValueType::Text, layout.clone(), Arc::new(TextCodec))
//!         .with_layout(ValueType::Long, layout, Arc::new(LongCodec))
//!         .build(),
//! );
//!
//! let provider = Arc::new(attrstore::backend::sqlite::SqliteProvider::new("notes.db"));
//! let repo: Repository<NoteKey> = Repository::new(provider, registry, "note");
//!
//! let mut values: AttrValues<NoteKey> = HashMap::new();
//! values.insert(NoteKey::Title, vec![Value::Text("hello".into())]);
//! values.insert(NoteKey::Views, vec![Value::Long(7)]);
//! repo.store(42, &values).await?;
//!
//! let found = repo.find_by_id(42).await?;
//! assert_eq!(found.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod core;
pub mod handler;
pub mod layout;
pub mod registry;
pub mod repository;

// Re-export main types for convenience
pub use crate::core::{
    AttrError, AttrValues, AttributeKey, Entity, Result, Row, SqlValue, Value, ValueType,
};
pub use crate::handler::{LayoutTypeHandler, TypeHandler};
pub use crate::layout::{
    ChangesDetector, MinimalLayout, PersistentLayout, StoredRow, StoredValue, TableLayout,
};
pub use crate::registry::{TypeHandlerRegistry, TypeHandlerRegistryBuilder};
pub use crate::repository::{
    EntityMapper, MappedRepository, ParallelRepository, Repository, TransactionalRepository,
};

/// Commonly used imports bundled for gluing a repository together.
pub mod prelude {
    pub use crate::backend::{ConnectionProvider, SqlConnection};
    pub use crate::codec::{
        InstantMillisCodec, InstantSecondsCodec, JsonCodec, LongCodec, TextCodec, ValueCodec,
    };
    pub use crate::core::{
        AttrError, AttrValues, AttributeKey, Entity, Result, SqlValue, Value, ValueType,
    };
    pub use crate::handler::{LayoutTypeHandler, TypeHandler};
    pub use crate::layout::{MinimalLayout, PersistentLayout, TableLayout};
    pub use crate::registry::{TypeHandlerRegistry, TypeHandlerRegistryBuilder};
    pub use crate::repository::{
        EntityMapper, MappedRepository, ParallelRepository, Repository, TransactionalRepository,
    };
}
