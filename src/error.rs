//! Error types for the memoizing cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache itself.
///
/// Failures of a caller's compute function never pass through this type;
/// they are returned to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// An argument cannot be compared by value
    #[error("Unhashable argument: {0}")]
    UnhashableArgument(String),

    /// The operation was never registered
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The operation id is already registered
    #[error("Operation already registered: {0}")]
    DuplicateOperation(String),

    /// The registration metadata is not usable
    #[error("Invalid operation '{operation}': {reason}")]
    InvalidOperation { operation: String, reason: String },

    /// The caller asked for a different value type than was registered
    #[error("Type mismatch for '{operation}': registered {registered}, requested {requested}")]
    TypeMismatch {
        operation: String,
        registered: &'static str,
        requested: &'static str,
    },

    /// Data operation used as a resource, or the other way around
    #[error("Kind mismatch for '{operation}': registered as {registered}")]
    KindMismatch {
        operation: String,
        registered: &'static str,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
