//! Cache Module
//!
//! Provides in-process memoization with TTL expiration, per-operation FIFO
//! capacity bounds and validation of cached resources.

mod entry;
mod fifo;
mod key;
mod memo;
mod operation;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, EntryKind, SharedValue};
pub use fifo::FifoTracker;
pub use key::{ArgValue, CacheKey, CallArgs, IntoArg};
pub use memo::MemoCache;
pub use operation::{BoxError, OperationMeta, OperationSpec, Validator};
pub use stats::CacheStats;
pub use store::CacheStore;
