use crate::core::value::ValueType;
use thiserror::Error;

/// Errors produced by the attribute engine.
///
/// Backend failures pass through unchanged; the engine never retries and
/// never converts an error into an empty result.
#[derive(Error, Debug)]
pub enum AttrError {
    #[error("no type handler registered for value type {0}")]
    UnresolvedType(ValueType),

    #[error("invalid table or column name {0:?}")]
    InvalidIdentifier(String),

    #[error("unexpected {actual} value for {codec} codec")]
    UnexpectedValue { codec: String, actual: String },

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AttrError {
    /// Wraps any backend-side failure without losing the source.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// Backend failure described by a plain message, for adapters whose
    /// native errors are not `std::error::Error`.
    pub fn backend_msg(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into().into())
    }

    pub fn unexpected_value(codec: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            codec: codec.into(),
            actual: actual.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AttrError>;
