//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Type-erased value held by an entry.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

// == Entry Kind ==
/// How a cached value is handed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Plain data; every caller receives its own clone
    Data,
    /// Live resource; every caller shares the same handle
    Resource,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Data => "data",
            EntryKind::Resource => "resource",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: SharedValue,
    /// Insertion instant, fixed for the life of the entry
    pub created_at: Instant,
    /// Retention period, None = no expiration
    pub ttl: Option<Duration>,
    /// Data or resource semantics
    pub kind: EntryKind,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current instant.
    pub fn new(value: SharedValue, ttl: Option<Duration>, kind: EntryKind) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            kind,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl` has elapsed since
    /// insertion; at exactly `ttl` it is still live.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against an explicit instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.created_at) > ttl,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining retention time, or None if no TTL is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the TTL has elapsed
    /// - `Some(remaining)` if the entry is still live
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.ttl.map(|ttl| {
            let elapsed = Instant::now().saturating_duration_since(self.created_at);
            ttl.saturating_sub(elapsed)
        })
    }
}
