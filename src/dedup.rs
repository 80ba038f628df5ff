//! Bounded recency set that keeps one message from being relayed twice.
//!
//! The cache remembers which message ids have already been processed across
//! scheduling ticks. It is process-lifetime state only; a restart forgets
//! everything and the next tick starts fresh.

use crate::chat::MessageId;
use crate::defaults;
use std::collections::{HashSet, VecDeque};

/// Recency set with batch eviction.
///
/// Recency is tracked by an explicit insertion-order queue rather than by
/// id value, so reused or out-of-order ids still evict oldest-first. When
/// an insert would push the cache past its high-water mark, the oldest
/// batch is dropped in one sweep before the new id goes in.
#[derive(Debug)]
pub struct DedupCache {
    ids: HashSet<MessageId>,
    order: VecDeque<MessageId>,
    high_water: usize,
    evict_batch: usize,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::with_limits(defaults::DEDUP_HIGH_WATER, defaults::DEDUP_EVICT_BATCH)
    }

    pub fn with_limits(high_water: usize, evict_batch: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            high_water,
            evict_batch,
        }
    }

    /// Returns true if the id was recorded and has not been evicted since.
    pub fn seen(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    /// Remembers an id. Re-recording a live id changes nothing.
    pub fn record(&mut self, id: MessageId) {
        if self.ids.contains(&id) {
            return;
        }

        if self.order.len() >= self.high_water {
            let batch = self.evict_batch.min(self.order.len());
            for old in self.order.drain(..batch) {
                self.ids.remove(&old);
            }
        }

        self.ids.insert(id);
        self.order.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}
