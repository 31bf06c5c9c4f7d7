//! The calculation engine: registration, dispatch, batching and teardown.
//!
//! One [`CalculationEngine`] instance owns its cache store, frequency
//! tracker, performance records and batch queues outright; registered
//! providers are shared references whose lifetime is the caller's concern.
//! Construct an engine explicitly and pass it where it is needed — there is
//! no process-wide instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::batch::{BatchCoalescer, BatchTicket, PendingBatch};
use crate::cache::{CacheEntry, CacheStore, EvictionPolicy};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::key;
use crate::maintenance::{self, MaintenanceWorkers};
use crate::memo::MemoStore;
use crate::provider::{ComputeProvider, ProviderRegistry};
use crate::stats::{
    CacheStats, EngineCounters, ExtendedStats, FrequencyTracker, GlobalPerf, KeyFrequency,
    PerfCollector,
};

/// Advisory priority accepted on dispatch options.
///
/// Read by call sites for their own bookkeeping; the adaptive TTL and
/// eviction math infers importance from measured cost and frequency
/// instead of consulting this field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalcPriority {
    /// The caller considers this request urgent.
    High,
    /// Default priority.
    #[default]
    Medium,
    /// The caller considers this request deferrable.
    Low,
}

/// Per-call dispatch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalcOptions {
    /// Bypass the cache entirely: no lookup, no insertion.
    pub no_cache: bool,
    /// Advisory caller priority; pass-through metadata.
    pub priority: CalcPriority,
    /// Advisory heaviness hint; the engine measures cost itself.
    pub heavy_calculation: bool,
}

impl CalcOptions {
    /// Options with `no_cache` set.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            no_cache: true,
            ..Self::default()
        }
    }
}

/// Mutable engine state behind one lock: the dispatcher, the batch drain
/// and the maintenance workers all go through it.
pub(crate) struct EngineState {
    pub(crate) config: EngineConfig,
    pub(crate) store: CacheStore,
    pub(crate) frequency: FrequencyTracker,
    pub(crate) perf: PerfCollector,
    pub(crate) counters: EngineCounters,
    pub(crate) memo: MemoStore,
}

/// State shared between the engine handle and its worker threads.
pub(crate) struct Shared {
    pub(crate) state: Mutex<EngineState>,
    pub(crate) registry: Mutex<ProviderRegistry>,
    pub(crate) closed: AtomicBool,
}

/// Adaptive computation cache and dispatch engine.
///
/// Callers register named [`ComputeProvider`]s, then dispatch operations
/// through [`calculate`](Self::calculate). Results are cached with a TTL
/// derived from measured cost and request frequency; concurrent batchable
/// requests coalesce into one underlying invocation; background workers
/// sweep expired entries and retune capacity from the observed hit rate.
///
/// ```rust
/// use recalc_engine::prelude::*;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let engine = CalculationEngine::new();
/// engine
///     .register(
///         "math",
///         Arc::new(FnProvider::new().operation("square", |args| {
///             let x = args[0].as_f64().unwrap_or(0.0);
///             Ok(json!(x * x))
///         })),
///     )
///     .unwrap();
///
/// let result = engine.calculate("math", "square", &[json!(4)]).unwrap();
/// assert_eq!(result, json!(16.0));
/// ```
pub struct CalculationEngine {
    shared: Arc<Shared>,
    batch: Arc<BatchCoalescer>,
    maintenance: Mutex<Option<MaintenanceWorkers>>,
}

impl CalculationEngine {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState {
                config,
                store: CacheStore::new(),
                frequency: FrequencyTracker::new(),
                perf: PerfCollector::new(),
                counters: EngineCounters::default(),
                memo: MemoStore::new(),
            }),
            registry: Mutex::new(ProviderRegistry::new()),
            closed: AtomicBool::new(false),
        });

        let drain_shared = Arc::clone(&shared);
        let batch = BatchCoalescer::start(move |queue| drain_batch(&drain_shared, queue));
        let maintenance = MaintenanceWorkers::start(Arc::clone(&shared));

        Self {
            shared,
            batch,
            maintenance: Mutex::new(Some(maintenance)),
        }
    }

    /// Register a provider under `name`, overwriting any prior registration.
    pub fn register(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn ComputeProvider>,
    ) -> EngineResult<()> {
        if self.is_closed() {
            return Err(EngineError::EngineClosed);
        }
        self.shared.registry.lock().register(name, provider)
    }

    /// Check whether a provider is registered under `name`.
    #[must_use]
    pub fn has_provider(&self, name: &str) -> bool {
        self.shared.registry.lock().contains(name)
    }

    /// Names of all registered providers.
    #[must_use]
    pub fn providers(&self) -> Vec<String> {
        self.shared.registry.lock().names()
    }

    /// Dispatch `provider.operation(args)` with default options.
    pub fn calculate(
        &self,
        provider: &str,
        operation: &str,
        args: &[Value],
    ) -> EngineResult<Value> {
        self.calculate_with(provider, operation, args, CalcOptions::default())
    }

    /// Dispatch `provider.operation(args)`, fully synchronous.
    ///
    /// On a live cache hit the stored value is returned without invoking
    /// the provider. On a miss the operation is invoked (through the
    /// memoization layer where enabled), timed, recorded and — unless
    /// `no_cache` — inserted with an adaptively chosen TTL and priority.
    /// Provider errors are logged with context and propagated unmodified.
    pub fn calculate_with(
        &self,
        provider: &str,
        operation: &str,
        args: &[Value],
        options: CalcOptions,
    ) -> EngineResult<Value> {
        if self.is_closed() {
            return Err(EngineError::EngineClosed);
        }
        let cache_key = key::encode(provider, operation, args);
        trace!(
            provider,
            operation,
            priority = ?options.priority,
            heavy_hint = options.heavy_calculation,
            "dispatching calculation"
        );

        // Frequency is bumped unconditionally, cache hit or not; the count
        // biases TTL and eviction for later insertions of this key.
        let frequency = {
            let mut state = self.shared.state.lock();
            let frequency = state.frequency.bump(&cache_key);
            if !options.no_cache {
                if let Some(value) = state.store.get(&cache_key, Instant::now()) {
                    state.counters.hits += 1;
                    return Ok(value);
                }
            }
            frequency
        };

        let provider_ref = self
            .shared
            .registry
            .lock()
            .get(provider)
            .ok_or_else(|| EngineError::provider_not_registered(provider))?;
        if !provider_ref.has_operation(operation) {
            return Err(EngineError::operation_not_found(provider, operation));
        }

        let memoized = self.shared.state.lock().memo.is_enabled(provider, operation);
        let args_key = key::encode_args(args);

        let started = Instant::now();
        let mut memo_hit = false;
        let value = if memoized {
            let stored = self.shared.state.lock().memo.get(provider, operation, &args_key);
            match stored {
                Some(value) => {
                    memo_hit = true;
                    value
                }
                None => {
                    let value = invoke_logged(provider_ref.as_ref(), provider, operation, args)?;
                    self.shared
                        .state
                        .lock()
                        .memo
                        .store(provider, operation, args_key, value.clone());
                    value
                }
            }
        } else {
            invoke_logged(provider_ref.as_ref(), provider, operation, args)?
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut state = self.shared.state.lock();
        state.perf.record(provider, operation, elapsed_ms);
        if memo_hit {
            state.counters.optimized += 1;
        }
        if !options.no_cache {
            let mut ttl = state.config.base_ttl;
            if elapsed_ms > state.config.heavy_cost_threshold_ms {
                ttl = state.config.heavy_ttl;
                state.counters.heavy += 1;
            }
            if frequency > state.config.frequency_bias_threshold {
                ttl *= 2;
            }
            let priority = elapsed_ms.min(100.0) * 10.0 + frequency as f64 * 5.0;
            let now = Instant::now();
            let entry = CacheEntry::new(value.clone(), ttl, elapsed_ms, priority, now);
            let capacity = state.config.max_entries;
            let policy = state.config.eviction;
            state.store.insert(cache_key, entry, capacity, policy, now);
        }
        state.counters.misses += 1;
        Ok(value)
    }

    /// Submit a batchable request and return its deferred result.
    ///
    /// Requests for the same `(provider, operation)` pair arriving within
    /// the coalescing window share one underlying invocation when the
    /// provider exposes an `<operation>_batch` variant, and otherwise run
    /// individually in submission order. This path never consults the
    /// cache; frequency is still recorded at submission time.
    pub fn calculate_batched(
        &self,
        provider: &str,
        operation: &str,
        args: Vec<Value>,
    ) -> BatchTicket {
        if self.is_closed() {
            return BatchTicket::closed();
        }
        let cache_key = key::encode(provider, operation, &args);
        let window = {
            let mut state = self.shared.state.lock();
            state.frequency.bump(&cache_key);
            state.counters.batched += 1;
            state.config.batch_window
        };
        self.batch.submit(provider, operation, args, window)
    }

    /// Clear the whole cache, or only entries belonging to one provider.
    /// Resets the hit/miss counters either way. Returns the removed count.
    pub fn clear_cache(&self, provider: Option<&str>) -> usize {
        let mut state = self.shared.state.lock();
        let removed = match provider {
            None => state.store.clear(),
            Some(name) => state.store.clear_prefix(&key::provider_prefix(name)),
        };
        state.counters.reset_hit_miss();
        debug!(removed, provider = ?provider, "cleared cache");
        removed
    }

    /// Basic cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        CacheStats {
            size: state.store.len(),
            max_size: state.config.max_entries,
            hits: state.counters.hits,
            misses: state.counters.misses,
            total_requests: state.counters.total_requests(),
            hit_rate: state.counters.hit_rate(),
        }
    }

    /// Extended statistics: the basic snapshot plus performance, frequency
    /// and batching summaries.
    #[must_use]
    pub fn extended_stats(&self) -> ExtendedStats {
        let pending_batch_queues = self.batch.pending_queues();
        let state = self.shared.state.lock();
        ExtendedStats {
            cache: CacheStats {
                size: state.store.len(),
                max_size: state.config.max_entries,
                hits: state.counters.hits,
                misses: state.counters.misses,
                total_requests: state.counters.total_requests(),
                hit_rate: state.counters.hit_rate(),
            },
            evictions: state.store.evictions(),
            expirations: state.store.expirations(),
            approx_value_bytes: state.store.approx_bytes(),
            optimized_calculations: state.counters.optimized,
            heavy_calculations: state.counters.heavy,
            batched_requests: state.counters.batched,
            preload_candidates: state.counters.preload_candidates,
            pending_batch_queues,
            tracked_keys: state.frequency.len(),
            top_frequent: state
                .frequency
                .top_n(10)
                .into_iter()
                .map(|(key, count)| KeyFrequency { key, count })
                .collect(),
            slowest_operations: state.perf.top_slowest(10),
            global: GlobalPerf {
                count: state.perf.global_count(),
                total_ms: state.perf.global_total_ms(),
                avg_ms: state.perf.global_avg_ms(),
            },
        }
    }

    /// Enable memoization for a registered provider, either for every
    /// operation (`None`) or an explicit list. Listed operations are
    /// checked against the provider up front.
    pub fn enable_memoization(
        &self,
        provider: &str,
        operations: Option<&[&str]>,
    ) -> EngineResult<()> {
        let provider_ref = self
            .shared
            .registry
            .lock()
            .get(provider)
            .ok_or_else(|| EngineError::provider_not_registered(provider))?;

        let validated: Option<Vec<String>> = match operations {
            None => None,
            Some(names) => {
                for name in names {
                    if !provider_ref.has_operation(name) {
                        return Err(EngineError::operation_not_found(provider, *name));
                    }
                }
                Some(names.iter().map(|name| (*name).to_owned()).collect())
            }
        };

        self.shared
            .state
            .lock()
            .memo
            .enable(provider, validated.as_deref());
        debug!(provider, operations = ?operations, "memoization enabled");
        Ok(())
    }

    /// Insert a value directly under a caller-chosen key.
    ///
    /// The legacy set path: caller-supplied TTL and priority, zero compute
    /// cost, age-based eviction regardless of the configured adaptive
    /// policy. `ttl` defaults to the base TTL, `priority` to zero.
    pub fn insert_direct(
        &self,
        cache_key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
        priority: Option<f64>,
    ) {
        let mut state = self.shared.state.lock();
        let now = Instant::now();
        let ttl = ttl.unwrap_or(state.config.base_ttl);
        let entry = CacheEntry::new(value, ttl, 0.0, priority.unwrap_or(0.0), now);
        let capacity = state.config.max_entries;
        state
            .store
            .insert(cache_key.into(), entry, capacity, EvictionPolicy::OldestFirst, now);
    }

    /// Reset a cached entry's expiry to `ttl` (default: base TTL) from now.
    /// Returns `false` for unknown keys.
    pub fn update_expiry(&self, cache_key: &str, ttl: Option<Duration>) -> bool {
        let mut state = self.shared.state.lock();
        let ttl = ttl.unwrap_or(state.config.base_ttl);
        state.store.update_expiry(cache_key, ttl, Instant::now())
    }

    /// Check whether a live entry exists for `cache_key`. An expired entry
    /// is removed on the spot.
    pub fn contains(&self, cache_key: &str) -> bool {
        self.shared.state.lock().store.contains(cache_key, Instant::now())
    }

    /// Replace the configuration after re-validation. If the new capacity
    /// is smaller, the store is evicted down to it immediately.
    pub fn update_config(&self, config: EngineConfig) -> EngineResult<()> {
        config.validate()?;
        let mut state = self.shared.state.lock();
        let now = Instant::now();
        while state.store.len() > config.max_entries {
            if state.store.evict_one(config.eviction, now).is_none() {
                break;
            }
        }
        state.config = config;
        Ok(())
    }

    /// Snapshot of the current configuration, including self-tuned values.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.shared.state.lock().config.clone()
    }

    /// Run one expired-entry cleanup sweep immediately. Returns the number
    /// of entries removed. The periodic worker keeps running.
    pub fn run_cleanup(&self) -> usize {
        maintenance::cleanup_pass(&self.shared)
    }

    /// Run one self-tuning pass immediately. The periodic worker keeps
    /// running.
    pub fn run_tuning(&self) {
        maintenance::tuning_pass(&self.shared);
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Tear the engine down: stop the batch worker (rejecting pending
    /// tickets), stop both maintenance workers, and clear every internal
    /// map. Idempotent; also runs on drop.
    pub fn destroy(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.batch.shutdown();
        if let Some(workers) = self.maintenance.lock().take() {
            workers.shutdown();
        }
        {
            let mut state = self.shared.state.lock();
            state.store.clear();
            state.frequency.clear();
            state.perf.clear();
            state.memo.clear();
        }
        self.shared.registry.lock().clear();
        debug!("engine destroyed");
    }
}

impl Default for CalculationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CalculationEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for CalculationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("CalculationEngine")
            .field("entries", &state.store.len())
            .field("max_entries", &state.config.max_entries)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn invoke_logged(
    provider_ref: &dyn ComputeProvider,
    provider: &str,
    operation: &str,
    args: &[Value],
) -> EngineResult<Value> {
    provider_ref.invoke(operation, args).inspect_err(|err| {
        error!(provider, operation, error = %err, "calculation failed");
    })
}

/// Drain one due batch queue: one batch-variant invocation with results
/// distributed by index, or individual invocations in submission order.
fn drain_batch(shared: &Shared, queue: PendingBatch) {
    let PendingBatch {
        provider,
        operation,
        requests,
        ..
    } = queue;

    let Some(provider_ref) = shared.registry.lock().get(&provider) else {
        let err = EngineError::provider_not_registered(&provider);
        error!(%provider, %operation, "batch rejected: provider not registered");
        for request in requests {
            request.respond(Err(err.clone()));
        }
        return;
    };

    // The batch variant takes precedence; a provider may expose only it.
    let batch_operation = format!("{operation}_batch");
    if !provider_ref.has_operation(&batch_operation) && !provider_ref.has_operation(&operation) {
        let err = EngineError::operation_not_found(&provider, &operation);
        error!(%provider, %operation, "batch rejected: operation not found");
        for request in requests {
            request.respond(Err(err.clone()));
        }
        return;
    }

    if provider_ref.has_operation(&batch_operation) {
        // True batch execution: one invocation, all-or-nothing delivery.
        let arg_sets = Value::Array(
            requests
                .iter()
                .map(|request| Value::Array(request.args.clone()))
                .collect(),
        );
        let started = Instant::now();
        let outcome = provider_ref.invoke(&batch_operation, &[arg_sets]);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let err = match outcome {
            Ok(Value::Array(values)) if values.len() == requests.len() => {
                shared
                    .state
                    .lock()
                    .perf
                    .record(&provider, &batch_operation, elapsed_ms);
                for (request, value) in requests.into_iter().zip(values) {
                    request.respond(Ok(value));
                }
                return;
            }
            Ok(Value::Array(values)) => EngineError::BatchShape {
                operation: batch_operation.clone(),
                expected: requests.len(),
                actual: values.len(),
            },
            Ok(_) => EngineError::computation(
                batch_operation.clone(),
                "batch variant must return an array of results",
            ),
            Err(err) => err,
        };
        error!(%provider, operation = %batch_operation, error = %err, "batch execution failed");
        for request in requests {
            request.respond(Err(err.clone()));
        }
    } else {
        // Individual fallback, in submission order; one failure does not
        // block the others.
        for request in requests {
            let started = Instant::now();
            let outcome = provider_ref.invoke(&operation, &request.args);
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match &outcome {
                Ok(_) => {
                    shared
                        .state
                        .lock()
                        .perf
                        .record(&provider, &operation, elapsed_ms);
                }
                Err(err) => {
                    error!(%provider, %operation, error = %err, "calculation failed");
                }
            }
            request.respond(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FnProvider;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn spy_provider(calls: Arc<AtomicUsize>) -> Arc<dyn ComputeProvider> {
        Arc::new(FnProvider::new().operation("square", move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            let x = args[0].as_f64().unwrap_or(0.0);
            Ok(json!(x * x))
        }))
    }

    fn engine_with_spy() -> (CalculationEngine, Arc<AtomicUsize>) {
        let engine = CalculationEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        engine.register("math", spy_provider(Arc::clone(&calls))).unwrap();
        (engine, calls)
    }

    #[test]
    fn second_identical_call_is_served_from_cache() {
        let (engine, calls) = engine_with_spy();

        assert_eq!(engine.calculate("math", "square", &[json!(4)]).unwrap(), json!(16.0));
        assert_eq!(engine.calculate("math", "square", &[json!(4)]).unwrap(), json!(16.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = engine.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn no_cache_always_reinvokes() {
        let (engine, calls) = engine_with_spy();

        for _ in 0..3 {
            engine
                .calculate_with("math", "square", &[json!(4)], CalcOptions::uncached())
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[test]
    fn unknown_provider_and_operation_are_rejected() {
        let (engine, _) = engine_with_spy();

        let err = engine.calculate("ghost", "noop", &[]).unwrap_err();
        assert!(matches!(err, EngineError::ProviderNotRegistered { .. }));

        let err = engine.calculate("math", "cube", &[json!(2)]).unwrap_err();
        assert!(matches!(err, EngineError::OperationNotFound { .. }));
    }

    #[test]
    fn provider_errors_propagate_unmodified() {
        let engine = CalculationEngine::new();
        engine
            .register(
                "bad",
                Arc::new(FnProvider::new().operation("fail", |_| {
                    Err(EngineError::computation("fail", "boom"))
                })),
            )
            .unwrap();

        let err = engine.calculate("bad", "fail", &[]).unwrap_err();
        assert_eq!(err, EngineError::computation("fail", "boom"));
    }

    #[test]
    fn memoization_skips_invocation_and_counts_as_optimized() {
        let (engine, calls) = engine_with_spy();
        engine.enable_memoization("math", None).unwrap();

        engine.calculate("math", "square", &[json!(3)]).unwrap();
        // Evict the main-cache entry; the memoized value must survive.
        engine.clear_cache(None);
        engine.calculate("math", "square", &[json!(3)]).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.extended_stats().optimized_calculations, 1);
    }

    #[test]
    fn memoization_validates_operation_names() {
        let (engine, _) = engine_with_spy();

        let err = engine
            .enable_memoization("math", Some(&["cube"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::OperationNotFound { .. }));

        let err = engine.enable_memoization("ghost", None).unwrap_err();
        assert!(matches!(err, EngineError::ProviderNotRegistered { .. }));
    }

    #[test]
    fn scoped_clear_only_touches_the_named_provider() {
        let (engine, _) = engine_with_spy();
        engine
            .register(
                "text",
                Arc::new(FnProvider::new().operation("len", |args| {
                    Ok(json!(args[0].as_str().unwrap_or("").len()))
                })),
            )
            .unwrap();

        engine.calculate("math", "square", &[json!(4)]).unwrap();
        engine.calculate("text", "len", &[json!("ab")]).unwrap();

        assert_eq!(engine.clear_cache(Some("math")), 1);
        let stats = engine.cache_stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn direct_insert_and_expiry_updates() {
        let engine = CalculationEngine::new();
        engine.insert_direct("manual:key", json!("v"), Some(Duration::from_millis(5)), None);
        assert!(engine.contains("manual:key"));

        assert!(engine.update_expiry("manual:key", Some(Duration::from_secs(60))));
        std::thread::sleep(Duration::from_millis(10));
        assert!(engine.contains("manual:key"));

        assert!(!engine.update_expiry("missing", None));
    }

    #[test]
    fn update_config_shrinks_the_store() {
        let engine = CalculationEngine::new();
        for i in 0..10 {
            engine.insert_direct(format!("k{i}"), json!(i), None, None);
        }

        engine
            .update_config(EngineConfig::new(3))
            .unwrap();
        assert!(engine.cache_stats().size <= 3);
        assert_eq!(engine.config().max_entries, 3);

        assert!(engine.update_config(EngineConfig::new(0)).is_err());
    }

    #[test]
    fn destroy_is_idempotent_and_closes_the_engine() {
        let (engine, _) = engine_with_spy();
        engine.calculate("math", "square", &[json!(2)]).unwrap();

        engine.destroy();
        engine.destroy();

        assert!(engine.is_closed());
        assert_eq!(engine.cache_stats().size, 0);
        assert!(engine.providers().is_empty());
        let err = engine.calculate("math", "square", &[json!(2)]).unwrap_err();
        assert_eq!(err, EngineError::EngineClosed);
        let ticket = engine.calculate_batched("math", "square", vec![json!(2)]);
        assert_eq!(ticket.wait(), Err(EngineError::EngineClosed));
    }
}
