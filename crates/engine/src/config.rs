//! Engine configuration.
//!
//! `EngineConfig` is mutable at runtime: the self-tuning maintenance pass
//! grows `max_entries` and `base_ttl` from observed hit rate, but only ever
//! gradually and never past the hard ceilings defined here.

use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::error::{EngineError, EngineResult};

/// Hard ceiling for `max_entries`; self-tuning growth stops here.
pub const MAX_ENTRIES_CEILING: usize = 5000;

/// Hard ceiling for `base_ttl`; self-tuning growth stops here.
pub const BASE_TTL_CEILING: Duration = Duration::from_secs(600);

/// Configuration for a [`CalculationEngine`](crate::engine::CalculationEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of entries in the cache store.
    pub max_entries: usize,
    /// TTL applied to ordinary results at insertion.
    pub base_ttl: Duration,
    /// TTL applied to results whose computation exceeded
    /// [`heavy_cost_threshold_ms`](Self::heavy_cost_threshold_ms).
    pub heavy_ttl: Duration,
    /// Computation time above which a result is treated as heavy.
    pub heavy_cost_threshold_ms: f64,
    /// Frequency count above which the chosen TTL is doubled.
    pub frequency_bias_threshold: u64,
    /// Eviction policy used by the adaptive dispatch path.
    pub eviction: EvictionPolicy,
    /// Coalescing window for batchable requests.
    pub batch_window: Duration,
    /// Interval between expired-entry cleanup sweeps.
    pub cleanup_interval: Duration,
    /// Interval between self-tuning passes.
    pub tuning_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            base_ttl: Duration::from_secs(60),
            heavy_ttl: Duration::from_secs(300),
            heavy_cost_threshold_ms: 100.0,
            frequency_bias_threshold: 10,
            eviction: EvictionPolicy::ValueScore,
            batch_window: Duration::from_millis(10),
            cleanup_interval: Duration::from_secs(60),
            tuning_interval: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with the given cache capacity.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    /// Set the base TTL.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_base_ttl(mut self, ttl: Duration) -> Self {
        self.base_ttl = ttl;
        self
    }

    /// Set the TTL for heavy results.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_heavy_ttl(mut self, ttl: Duration) -> Self {
        self.heavy_ttl = ttl;
        self
    }

    /// Set the heavy-computation threshold in milliseconds.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_heavy_cost_threshold_ms(mut self, threshold: f64) -> Self {
        self.heavy_cost_threshold_ms = threshold;
        self
    }

    /// Set the frequency count above which TTL is doubled.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_frequency_bias_threshold(mut self, threshold: u64) -> Self {
        self.frequency_bias_threshold = threshold;
        self
    }

    /// Set the eviction policy for the adaptive dispatch path.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    /// Set the batch coalescing window.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    /// Set the cleanup sweep interval.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set the self-tuning interval.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_tuning_interval(mut self, interval: Duration) -> Self {
        self.tuning_interval = interval;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_entries == 0 {
            return Err(EngineError::invalid_config("max_entries must be non-zero"));
        }
        if self.max_entries > MAX_ENTRIES_CEILING {
            return Err(EngineError::invalid_config(format!(
                "max_entries {} exceeds ceiling {MAX_ENTRIES_CEILING}",
                self.max_entries
            )));
        }
        if self.base_ttl.is_zero() {
            return Err(EngineError::invalid_config("base_ttl must be non-zero"));
        }
        if self.base_ttl > BASE_TTL_CEILING {
            return Err(EngineError::invalid_config(format!(
                "base_ttl {:?} exceeds ceiling {BASE_TTL_CEILING:?}",
                self.base_ttl
            )));
        }
        if self.heavy_ttl <= self.base_ttl {
            return Err(EngineError::invalid_config(
                "heavy_ttl must be greater than base_ttl",
            ));
        }
        if !(self.heavy_cost_threshold_ms > 0.0) {
            return Err(EngineError::invalid_config(
                "heavy_cost_threshold_ms must be positive",
            ));
        }
        if self.batch_window.is_zero() {
            return Err(EngineError::invalid_config("batch_window must be non-zero"));
        }
        if self.cleanup_interval.is_zero() || self.tuning_interval.is_zero() {
            return Err(EngineError::invalid_config(
                "maintenance intervals must be non-zero",
            ));
        }
        Ok(())
    }
}
