//! Engine bookkeeping: request counters, frequency tracking and
//! execution-time records, plus the snapshot types exposed to callers.

mod frequency;
mod perf;

pub use frequency::{FrequencyTracker, MAX_TRACKED_KEYS, PRUNE_BATCH};
pub use perf::{PerfCollector, PerfRecord};

use serde::Serialize;

/// Plain hit/miss and special-path counters owned by one engine instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineCounters {
    /// Main-cache hits.
    pub hits: u64,
    /// Main-cache misses (including `no_cache` dispatches).
    pub misses: u64,
    /// Memoization hits that skipped an invocation.
    pub optimized: u64,
    /// Invocations whose measured cost crossed the heavy threshold.
    pub heavy: u64,
    /// Requests submitted through the batch coalescer.
    pub batched: u64,
    /// Cumulative frequent-but-uncached keys seen by the tuning pass.
    pub preload_candidates: u64,
}

impl EngineCounters {
    /// Hits plus misses.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage of total requests; zero when idle.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    /// Reset the hit/miss counters, leaving the special-path counters alone.
    pub fn reset_hit_miss(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }
}

/// Basic cache statistics, as returned by
/// [`CalculationEngine::cache_stats`](crate::engine::CalculationEngine::cache_stats).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently stored.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Main-cache hits.
    pub hits: u64,
    /// Main-cache misses.
    pub misses: u64,
    /// Hits plus misses.
    pub total_requests: u64,
    /// Hit rate as a percentage of total requests.
    pub hit_rate: f64,
}

/// One entry of the "most frequent keys" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFrequency {
    /// The cache key.
    pub key: String,
    /// How often it has been requested.
    pub count: u64,
}

/// Global execution-time totals across every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalPerf {
    /// Total timed invocations.
    pub count: u64,
    /// Total execution time in milliseconds.
    pub total_ms: f64,
    /// Mean execution time in milliseconds.
    pub avg_ms: f64,
}

/// Extended statistics: the basic snapshot plus performance, frequency and
/// batching summaries for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedStats {
    /// The basic cache snapshot.
    pub cache: CacheStats,
    /// Entries evicted under capacity pressure.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    /// Approximate bytes held by cached payloads.
    pub approx_value_bytes: u64,
    /// Memoization hits that skipped an invocation.
    pub optimized_calculations: u64,
    /// Invocations that crossed the heavy-cost threshold.
    pub heavy_calculations: u64,
    /// Requests submitted through the batch coalescer.
    pub batched_requests: u64,
    /// Cumulative frequent-but-uncached keys seen by the tuning pass.
    pub preload_candidates: u64,
    /// Batch queues currently waiting on their coalescing window.
    pub pending_batch_queues: usize,
    /// Distinct keys currently tracked by the frequency tracker.
    pub tracked_keys: usize,
    /// Most frequently requested keys, most frequent first.
    pub top_frequent: Vec<KeyFrequency>,
    /// Slowest operations by mean execution time, slowest first.
    pub slowest_operations: Vec<PerfRecord>,
    /// Global execution-time totals.
    pub global: GlobalPerf,
}
