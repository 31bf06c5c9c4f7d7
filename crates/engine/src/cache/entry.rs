//! Cache entry metadata.

use std::time::{Duration, Instant};

use serde_json::Value;

/// A cached computation result with the metadata the eviction and
/// maintenance machinery needs.
///
/// Owned exclusively by the [`CacheStore`](super::CacheStore); mutated in
/// place on every hit and destroyed on expiry, eviction or clear.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached result.
    pub value: Value,
    /// Absolute expiry time.
    pub expires_at: Instant,
    /// When the entry was created.
    pub created_at: Instant,
    /// Milliseconds it took to produce the value.
    pub compute_cost_ms: f64,
    /// Number of times the entry has been served. Starts at 1: the
    /// computation that produced the value counts as the first access.
    pub access_count: u64,
    /// When the entry was last served.
    pub last_accessed: Instant,
    /// Retention score assigned at insertion time.
    pub priority: f64,
    /// Approximate in-memory size of the payload.
    pub approx_bytes: u64,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from `now`.
    #[must_use]
    pub fn new(value: Value, ttl: Duration, compute_cost_ms: f64, priority: f64, now: Instant) -> Self {
        let approx_bytes = approx_value_bytes(&value);
        Self {
            value,
            expires_at: now + ttl,
            created_at: now,
            compute_cost_ms,
            access_count: 1,
            last_accessed: now,
            priority,
            approx_bytes,
        }
    }

    /// Update access metadata on a hit.
    pub fn mark_accessed(&mut self, now: Instant) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    /// Check whether the entry has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Push the expiry further into the future.
    pub fn extend_expiry(&mut self, extra: Duration) {
        self.expires_at += extra;
    }
}

/// Rough size estimate of a JSON payload, in bytes.
///
/// Deliberately cheap and approximate — the numbers feed diagnostics, not
/// allocation decisions.
#[must_use]
pub fn approx_value_bytes(value: &Value) -> u64 {
    match value {
        Value::Null | Value::Bool(_) => 4,
        Value::Number(_) => 8,
        Value::String(s) => s.len() as u64 + 16,
        Value::Array(items) => 16 + items.iter().map(approx_value_bytes).sum::<u64>(),
        Value::Object(fields) => {
            32 + fields
                .iter()
                .map(|(k, v)| k.len() as u64 + 8 + approx_value_bytes(v))
                .sum::<u64>()
        }
    }
}
