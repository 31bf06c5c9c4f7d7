//! Bounded request-frequency tracking.

use std::collections::HashMap;

/// Number of distinct keys the tracker holds before pruning kicks in.
pub const MAX_TRACKED_KEYS: usize = 1000;

/// Number of lowest-count keys removed by one pruning pass.
pub const PRUNE_BATCH: usize = 200;

/// Counts how often each cache key is requested.
///
/// Every dispatch bumps its key, hit or miss, so the counts feed both the
/// TTL bias at insertion time and the preload bookkeeping in the tuning
/// pass. The map is bounded: once it holds more than [`MAX_TRACKED_KEYS`]
/// distinct keys, the [`PRUNE_BATCH`] lowest-count keys are dropped (ties
/// broken arbitrarily).
#[derive(Debug, Default)]
pub struct FrequencyTracker {
    counts: HashMap<String, u64>,
}

impl FrequencyTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request for `key` and return its updated count.
    pub fn bump(&mut self, key: &str) -> u64 {
        let count = match self.counts.get_mut(key) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                self.counts.insert(key.to_owned(), 1);
                1
            }
        };
        if self.counts.len() > MAX_TRACKED_KEYS {
            self.prune();
        }
        count
    }

    /// Current count for `key`, zero if never seen (or pruned).
    #[must_use]
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` if no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most-requested keys, most frequent first.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let mut items: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1));
        items.truncate(n);
        items
    }

    /// Forget every key.
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    fn prune(&mut self) {
        let mut items: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();
        items.sort_by_key(|(_, count)| *count);
        for (key, _) in items.into_iter().take(PRUNE_BATCH) {
            self.counts.remove(&key);
        }
    }
}
