//! Eviction policies for the cache store.
//!
//! Two strategies coexist behind one abstraction because both are exercised
//! by different call paths: the legacy direct-set path evicts by age alone,
//! while the adaptive dispatch path protects entries that are expensive to
//! recompute, frequently used and recently touched.

use std::collections::HashMap;
use std::time::Instant;

use super::entry::CacheEntry;

/// Strategy for choosing the entry to discard when the store is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest creation time.
    OldestFirst,
    /// Evict the entry with the lowest retention score
    /// `priority * access_count * compute_cost / (idle_ms + 1)`.
    #[default]
    ValueScore,
}

impl EvictionPolicy {
    /// Select the key to evict, or `None` if the store is empty.
    #[must_use]
    pub(crate) fn victim(self, entries: &HashMap<String, CacheEntry>, now: Instant) -> Option<String> {
        match self {
            Self::OldestFirst => entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone()),
            Self::ValueScore => entries
                .iter()
                .min_by(|(_, a), (_, b)| {
                    retention_score(a, now).total_cmp(&retention_score(b, now))
                })
                .map(|(key, _)| key.clone()),
        }
    }
}

/// Retention score of an entry at eviction time. Higher scores survive.
#[must_use]
pub(crate) fn retention_score(entry: &CacheEntry, now: Instant) -> f64 {
    let idle_ms = now.saturating_duration_since(entry.last_accessed).as_secs_f64() * 1000.0;
    (entry.priority * entry.access_count as f64 * entry.compute_cost_ms) / (idle_ms + 1.0)
}
