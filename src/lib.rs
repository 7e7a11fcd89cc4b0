//! Memo Cache - An in-process memoizing cache
//!
//! Caches results of registered operations by argument value, with TTL
//! expiration, per-operation FIFO capacity bounds and validation of cached
//! resources.

pub mod cache;
pub mod config;
pub mod error;
pub mod services;
pub mod tasks;

pub use cache::{CallArgs, MemoCache, OperationSpec};
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_cleanup_task;
