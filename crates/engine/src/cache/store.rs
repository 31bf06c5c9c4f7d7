//! The cache store: key → entry map with TTL and bounded capacity.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use super::entry::CacheEntry;
use super::policy::EvictionPolicy;

/// Bounded TTL cache keyed by encoded cache keys.
///
/// Expired entries are removed lazily on access (only the key being read is
/// checked) and in bulk by the maintenance cleanup sweep. Capacity is
/// enforced at insertion time: the configured eviction policy discards the
/// lowest-ranked entry until there is room.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    evictions: u64,
    expirations: u64,
    approx_bytes: u64,
}

impl CacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored, live or not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total evictions since creation (capacity pressure only).
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Total expirations since creation (lazy and swept).
    #[must_use]
    pub fn expirations(&self) -> u64 {
        self.expirations
    }

    /// Approximate bytes held by cached payloads.
    #[must_use]
    pub fn approx_bytes(&self) -> u64 {
        self.approx_bytes
    }

    /// Look up a live entry, updating its access metadata.
    ///
    /// An expired entry is removed on the spot and reported as absent.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Value> {
        let expired = match self.entries.get_mut(key) {
            None => return None,
            Some(entry) => {
                if entry.is_expired(now) {
                    true
                } else {
                    entry.mark_accessed(now);
                    return Some(entry.value.clone());
                }
            }
        };
        if expired {
            self.remove_counted(key, true);
        }
        None
    }

    /// Check liveness without touching access metadata.
    #[must_use]
    pub fn contains_live(&self, key: &str, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Check liveness, removing the entry on the spot if it has expired.
    /// Does not touch access metadata.
    pub fn contains(&mut self, key: &str, now: Instant) -> bool {
        if self.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            self.remove_counted(key, true);
            return false;
        }
        self.entries.contains_key(key)
    }

    /// Insert an entry, evicting with `policy` while the store is at
    /// `capacity`. Replacing an existing key never triggers eviction.
    pub fn insert(
        &mut self,
        key: String,
        entry: CacheEntry,
        capacity: usize,
        policy: EvictionPolicy,
        now: Instant,
    ) {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= capacity {
                if self.evict_one(policy, now).is_none() {
                    break;
                }
            }
        }
        self.approx_bytes += entry.approx_bytes;
        if let Some(previous) = self.entries.insert(key, entry) {
            self.approx_bytes = self.approx_bytes.saturating_sub(previous.approx_bytes);
        }
    }

    /// Evict a single entry chosen by `policy`. Returns the evicted key.
    pub fn evict_one(&mut self, policy: EvictionPolicy, now: Instant) -> Option<String> {
        let victim = policy.victim(&self.entries, now)?;
        self.remove_counted(&victim, false);
        debug!(key = %victim, ?policy, "evicted cache entry");
        Some(victim)
    }

    /// Remove a specific key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let entry = self.entries.remove(key)?;
        self.approx_bytes = self.approx_bytes.saturating_sub(entry.approx_bytes);
        Some(entry.value)
    }

    /// Delete every entry whose expiry has passed. Returns the count.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove_counted(key, true);
        }
        expired.len()
    }

    /// Remove every entry. Returns the count.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.approx_bytes = 0;
        count
    }

    /// Remove every entry whose key starts with `prefix`. Returns the count.
    pub fn clear_prefix(&mut self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &matching {
            self.remove(key);
        }
        matching.len()
    }

    /// Reset a live entry's expiry to `ttl` from `now`. Returns `false` for
    /// unknown keys.
    pub fn update_expiry(&mut self, key: &str, ttl: Duration, now: Instant) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = now + ttl;
                true
            }
            None => false,
        }
    }

    /// Extend the expiry of every live entry under `prefix` by `extra`.
    /// Returns how many entries were extended.
    pub fn extend_expiry_prefix(&mut self, prefix: &str, extra: Duration, now: Instant) -> usize {
        let mut extended = 0;
        for (key, entry) in &mut self.entries {
            if key.starts_with(prefix) && !entry.is_expired(now) {
                entry.extend_expiry(extra);
                extended += 1;
            }
        }
        extended
    }

    fn remove_counted(&mut self, key: &str, expired: bool) {
        if let Some(entry) = self.entries.remove(key) {
            self.approx_bytes = self.approx_bytes.saturating_sub(entry.approx_bytes);
            if expired {
                self.expirations += 1;
            } else {
                self.evictions += 1;
            }
        }
    }
}
