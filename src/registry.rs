//! Value-type to handler resolution.
//!
//! Two-phase lifecycle enforced by type: a mutable
//! [`TypeHandlerRegistryBuilder`] configured on one thread during startup,
//! then a frozen [`TypeHandlerRegistry`] shared read-only by every
//! repository. There is no way to mutate a built registry.

use crate::codec::ValueCodec;
use crate::core::{AttrError, Result, ValueType};
use crate::handler::{LayoutTypeHandler, TypeHandler};
use crate::layout::TableLayout;
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration-phase registry builder.
#[derive(Default)]
pub struct TypeHandlerRegistryBuilder {
    handlers: HashMap<ValueType, Arc<dyn TypeHandler>>,
}

impl TypeHandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a value type. A later registration for the
    /// same type replaces the earlier one.
    pub fn with(mut self, value_type: ValueType, handler: Arc<dyn TypeHandler>) -> Self {
        self.handlers.insert(value_type, handler);
        self
    }

    /// Registers a layout/codec pair, the common case.
    pub fn with_layout(
        self,
        value_type: ValueType,
        layout: Arc<dyn TableLayout>,
        codec: Arc<dyn ValueCodec>,
    ) -> Self {
        self.with(value_type, Arc::new(LayoutTypeHandler::new(layout, codec)))
    }

    /// Freezes the configuration.
    pub fn build(self) -> TypeHandlerRegistry {
        TypeHandlerRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable value-type to handler map. Fails closed: resolving an
/// unregistered type is an error, never a fallback.
pub struct TypeHandlerRegistry {
    handlers: HashMap<ValueType, Arc<dyn TypeHandler>>,
}

impl TypeHandlerRegistry {
    pub fn resolve(&self, value_type: ValueType) -> Result<Arc<dyn TypeHandler>> {
        self.handlers
            .get(&value_type)
            .cloned()
            .ok_or(AttrError::UnresolvedType(value_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LongCodec, TextCodec};
    use crate::layout::MinimalLayout;

    fn registry() -> TypeHandlerRegistry {
        let layout = Arc::new(MinimalLayout::new());
        TypeHandlerRegistryBuilder::new()
            .with_layout(ValueType::Text, layout.clone(), Arc::new(TextCodec))
            .with_layout(ValueType::Long, layout, Arc::new(LongCodec))
            .build()
    }

    #[test]
    fn test_resolve_registered_type() {
        assert!(registry().resolve(ValueType::Text).is_ok());
        assert!(registry().resolve(ValueType::Long).is_ok());
    }

    #[test]
    fn test_resolve_unregistered_type_fails_closed() {
        let Err(err) = registry().resolve(ValueType::Instant) else {
            panic!("expected unresolved type error");
        };
        assert!(matches!(err, AttrError::UnresolvedType(ValueType::Instant)));
    }
}
