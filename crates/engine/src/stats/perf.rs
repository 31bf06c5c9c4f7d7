//! Per-operation execution-time records.

use std::collections::HashMap;

use serde::Serialize;

/// Running execution-time statistics for one `provider.operation` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfRecord {
    /// Provider the operation belongs to.
    pub provider: String,
    /// Operation name.
    pub operation: String,
    /// Number of timed invocations.
    pub count: u64,
    /// Total execution time in milliseconds.
    pub total_ms: f64,
    /// Mean execution time in milliseconds. Always `total_ms / count`.
    pub avg_ms: f64,
    /// Fastest observed invocation.
    pub min_ms: f64,
    /// Slowest observed invocation.
    pub max_ms: f64,
}

impl PerfRecord {
    fn new(provider: &str, operation: &str, elapsed_ms: f64) -> Self {
        Self {
            provider: provider.to_owned(),
            operation: operation.to_owned(),
            count: 1,
            total_ms: elapsed_ms,
            avg_ms: elapsed_ms,
            min_ms: elapsed_ms,
            max_ms: elapsed_ms,
        }
    }

    fn record(&mut self, elapsed_ms: f64) {
        self.count += 1;
        self.total_ms += elapsed_ms;
        self.avg_ms = self.total_ms / self.count as f64;
        self.min_ms = self.min_ms.min(elapsed_ms);
        self.max_ms = self.max_ms.max(elapsed_ms);
    }

    /// Joined `provider.operation` name, as used in diagnostics.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}.{}", self.provider, self.operation)
    }
}

/// Collects execution-time statistics per operation, plus global totals.
///
/// Consumed by the self-tuning pass and by diagnostics snapshots; the
/// dispatch hot path only writes to it, never queries it.
#[derive(Debug, Default)]
pub struct PerfCollector {
    records: HashMap<(String, String), PerfRecord>,
    global_count: u64,
    global_total_ms: f64,
}

impl PerfCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one timed invocation of `provider.operation`.
    pub fn record(&mut self, provider: &str, operation: &str, elapsed_ms: f64) {
        self.global_count += 1;
        self.global_total_ms += elapsed_ms;
        match self
            .records
            .get_mut(&(provider.to_owned(), operation.to_owned()))
        {
            Some(record) => record.record(elapsed_ms),
            None => {
                self.records.insert(
                    (provider.to_owned(), operation.to_owned()),
                    PerfRecord::new(provider, operation, elapsed_ms),
                );
            }
        }
    }

    /// Statistics for one operation, if it has ever been timed.
    #[must_use]
    pub fn get(&self, provider: &str, operation: &str) -> Option<&PerfRecord> {
        self.records
            .get(&(provider.to_owned(), operation.to_owned()))
    }

    /// The `n` slowest operations by mean execution time, slowest first.
    #[must_use]
    pub fn top_slowest(&self, n: usize) -> Vec<PerfRecord> {
        let mut records: Vec<PerfRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| b.avg_ms.total_cmp(&a.avg_ms));
        records.truncate(n);
        records
    }

    /// Total timed invocations across all operations.
    #[must_use]
    pub fn global_count(&self) -> u64 {
        self.global_count
    }

    /// Total execution time across all operations, in milliseconds.
    #[must_use]
    pub fn global_total_ms(&self) -> f64 {
        self.global_total_ms
    }

    /// Mean execution time across all operations, in milliseconds.
    #[must_use]
    pub fn global_avg_ms(&self) -> f64 {
        if self.global_count == 0 {
            0.0
        } else {
            self.global_total_ms / self.global_count as f64
        }
    }

    /// Number of distinct operations timed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been timed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget every record and the global totals.
    pub fn clear(&mut self) {
        self.records.clear();
        self.global_count = 0;
        self.global_total_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_record_seeds_all_fields() {
        let mut perf = PerfCollector::new();
        perf.record("math", "square", 4.0);

        let record = perf.get("math", "square").unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.total_ms, 4.0);
        assert_eq!(record.avg_ms, 4.0);
        assert_eq!(record.min_ms, 4.0);
        assert_eq!(record.max_ms, 4.0);
        assert_eq!(record.name(), "math.square");
    }

    #[test]
    fn running_mean_never_drifts_from_totals() {
        let mut perf = PerfCollector::new();
        for elapsed in [2.0, 4.0, 9.0, 1.0] {
            perf.record("math", "square", elapsed);
        }

        let record = perf.get("math", "square").unwrap();
        assert_eq!(record.count, 4);
        assert_eq!(record.total_ms, 16.0);
        assert_eq!(record.avg_ms, record.total_ms / record.count as f64);
        assert_eq!(record.min_ms, 1.0);
        assert_eq!(record.max_ms, 9.0);
    }

    #[test]
    fn top_slowest_sorts_by_mean() {
        let mut perf = PerfCollector::new();
        perf.record("a", "fast", 1.0);
        perf.record("a", "slow", 100.0);
        perf.record("b", "medium", 10.0);

        let slowest = perf.top_slowest(2);
        assert_eq!(slowest.len(), 2);
        assert_eq!(slowest[0].name(), "a.slow");
        assert_eq!(slowest[1].name(), "b.medium");
    }

    #[test]
    fn global_totals_span_operations() {
        let mut perf = PerfCollector::new();
        perf.record("a", "x", 3.0);
        perf.record("b", "y", 5.0);

        assert_eq!(perf.global_count(), 2);
        assert_eq!(perf.global_total_ms(), 8.0);
        assert_eq!(perf.global_avg_ms(), 4.0);
    }

    #[test]
    fn empty_collector_reports_zero_average() {
        let perf = PerfCollector::new();
        assert!(perf.is_empty());
        assert_eq!(perf.global_avg_ms(), 0.0);
        assert!(perf.top_slowest(5).is_empty());
    }
}
