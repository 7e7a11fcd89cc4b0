//! FIFO Tracker Module
//!
//! Tracks insertion order of an operation's keys for capacity eviction.

use std::collections::VecDeque;

use crate::cache::CacheKey;

// == FIFO Tracker ==
/// Tracks insertion order for FIFO eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Reads never reorder keys; only (re-)insertion moves a key to the back.
#[derive(Debug, Default)]
pub struct FifoTracker {
    order: VecDeque<CacheKey>,
}

impl FifoTracker {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record Insert ==
    /// Marks a key as the newest insertion.
    ///
    /// A replaced key loses its old position.
    pub fn record_insert(&mut self, key: &CacheKey) {
        self.remove(key);
        self.order.push_back(key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest inserted key.
    pub fn pop_oldest(&mut self) -> Option<CacheKey> {
        self.order.pop_front()
    }

    /// Removes and returns every tracked key, oldest first.
    pub fn drain(&mut self) -> Vec<CacheKey> {
        self.order.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
