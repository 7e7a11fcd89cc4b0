//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with per-operation FIFO
//! tracking, TTL expiration and resource validation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheKey, CacheStats, EntryKind, FifoTracker, OperationMeta, SharedValue,
};
use crate::error::{CacheError, Result};

/// Registration plus insertion order of one operation.
#[derive(Debug)]
struct OperationState {
    meta: OperationMeta,
    order: FifoTracker,
}

/// Outcome of inspecting an existing entry.
enum Verdict {
    Absent,
    Expired,
    Rejected,
    Hit(SharedValue),
}

// == Cache Store ==
/// Main cache storage with FIFO capacity bounds and TTL support.
///
/// All methods take `&mut self`; callers share the store behind a lock so
/// each method body is one exclusive section.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry>,
    /// Registered operations by id
    operations: HashMap<String, OperationState>,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store with no registered operations.
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Registers an operation's metadata. Ids are unique.
    pub fn register(&mut self, meta: OperationMeta) -> Result<()> {
        if self.operations.contains_key(&meta.id) {
            return Err(CacheError::DuplicateOperation(meta.id));
        }

        info!(
            operation = %meta.id,
            kind = %meta.kind,
            ttl = ?meta.ttl,
            max_entries = ?meta.max_entries,
            "Registered cached operation"
        );
        self.operations.insert(
            meta.id.clone(),
            OperationState {
                meta,
                order: FifoTracker::new(),
            },
        );
        Ok(())
    }

    /// Returns the registration of `operation`.
    pub fn operation(&self, operation: &str) -> Result<&OperationMeta> {
        self.operations
            .get(operation)
            .map(|state| &state.meta)
            .ok_or_else(|| CacheError::UnknownOperation(operation.to_string()))
    }

    // == Lookup ==
    /// Returns the cached value for `key`, or None on a miss.
    ///
    /// Expired entries and resources rejected by their validator are
    /// dropped here and count as misses. The cache only drops its own
    /// reference; releasing a rejected resource is up to its holder.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<SharedValue> {
        let now = Instant::now();
        let verdict = match self.entries.get(key) {
            None => Verdict::Absent,
            Some(entry) if entry.is_expired_at(now) => Verdict::Expired,
            Some(entry) => {
                let validator = match entry.kind {
                    EntryKind::Resource => self
                        .operations
                        .get(key.operation())
                        .and_then(|state| state.meta.validator.clone()),
                    EntryKind::Data => None,
                };
                let usable = match validator {
                    None => true,
                    Some(validator) => match validator(&*entry.value) {
                        Ok(usable) => usable,
                        Err(e) => {
                            warn!(key = %key, error = %e, "Validator failed, dropping entry");
                            false
                        }
                    },
                };
                if usable {
                    Verdict::Hit(Arc::clone(&entry.value))
                } else {
                    Verdict::Rejected
                }
            }
        };

        match verdict {
            Verdict::Hit(value) => {
                self.stats.record_hit();
                debug!(key = %key, "Cache hit");
                return Some(value);
            }
            Verdict::Absent => {
                debug!(key = %key, "Cache miss");
            }
            Verdict::Expired => {
                self.remove_entry(key);
                self.stats.record_expiration();
                debug!(key = %key, "Cache miss, entry expired");
            }
            Verdict::Rejected => {
                self.remove_entry(key);
                self.stats.record_validation_failure();
                debug!(key = %key, "Cache miss, resource failed validation");
            }
        }
        self.stats.record_miss();
        None
    }

    // == Contains ==
    /// Returns true if a live, unexpired entry exists for `key`.
    ///
    /// Read-only: statistics, validation and eviction order are untouched.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Time To Live ==
    /// Remaining lifetime of the live entry for `key`.
    ///
    /// `None` if the entry is absent, expired or never expires.
    pub fn ttl_remaining(&self, key: &CacheKey) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(CacheEntry::ttl_remaining)
    }

    // == Insert ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// TTL and kind come from the operation's registration. If the
    /// operation then holds more entries than its bound, the oldest
    /// insertions are evicted until it fits.
    pub fn insert(&mut self, key: CacheKey, value: SharedValue) -> Result<()> {
        let state = self
            .operations
            .get_mut(key.operation())
            .ok_or_else(|| CacheError::UnknownOperation(key.operation().to_string()))?;

        let entry = CacheEntry::new(value, state.meta.ttl, state.meta.kind);
        state.order.record_insert(&key);

        let mut evicted = Vec::new();
        if let Some(max) = state.meta.max_entries {
            while state.order.len() > max {
                match state.order.pop_oldest() {
                    Some(oldest) => evicted.push(oldest),
                    None => break,
                }
            }
        }

        debug!(key = %key, "Cache insert");
        self.entries.insert(key, entry);
        self.stats.record_insertion();

        for oldest in evicted {
            self.entries.remove(&oldest);
            self.stats.record_eviction();
            debug!(key = %oldest, "Evicted oldest entry");
        }

        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Invalidate ==
    /// Removes the entry for `key`. Returns false if there was none.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        let removed = self.remove_entry(key);
        if removed {
            self.stats.record_invalidations(1);
            debug!(key = %key, "Invalidated entry");
        }
        removed
    }

    /// Removes every entry of `operation`. Unknown operations are a no-op.
    pub fn invalidate_operation(&mut self, operation: &str) -> usize {
        let Some(state) = self.operations.get_mut(operation) else {
            return 0;
        };

        let keys = state.order.drain();
        let count = keys.len();
        for key in keys {
            self.entries.remove(&key);
        }

        self.stats.record_invalidations(count);
        self.stats.set_total_entries(self.entries.len());
        if count > 0 {
            info!(operation, count, "Invalidated operation entries");
        }
        count
    }

    // == Clear ==
    /// Removes every entry of every operation. Registrations are kept.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        for state in self.operations.values_mut() {
            state.order.drain();
        }

        self.stats.record_invalidations(count);
        self.stats.set_total_entries(0);
        info!(count, "Cleared all cache entries");
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.remove_entry(&key);
            self.stats.record_expiration();
        }

        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of entries held for `operation`.
    pub fn len_for(&self, operation: &str) -> usize {
        self.operations
            .get(operation)
            .map_or(0, |state| state.order.len())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_entry(&mut self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            if let Some(state) = self.operations.get_mut(key.operation()) {
                state.order.remove(key);
            }
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }
}
