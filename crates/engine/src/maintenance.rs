//! Background maintenance: expired-entry cleanup and self-tuning.
//!
//! Two independent workers share one shutdown signal. Each pass runs under
//! `catch_unwind` so a failure is logged and suppressed; the periodic timer
//! itself must never die. Shutdown is condvar-signalled, so `destroy` does
//! not have to wait out a sleeping interval.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::config::{BASE_TTL_CEILING, MAX_ENTRIES_CEILING};
use crate::engine::Shared;
use crate::key;

/// How many frequent keys the tuning pass inspects for preload bookkeeping.
const PRELOAD_CANDIDATE_KEYS: usize = 50;

/// How many slow operations get their cached entries' expiry extended.
const SLOW_OPERATIONS_EXTENDED: usize = 10;

/// Hit rate below which the tuning pass grows the cache capacity.
const LOW_HIT_RATE_PCT: f64 = 70.0;

/// Hit rate above which the tuning pass grows the base TTL.
const HIGH_HIT_RATE_PCT: f64 = 90.0;

struct ShutdownSignal {
    flag: Mutex<bool>,
    wakeup: Condvar,
}

impl ShutdownSignal {
    fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            wakeup: Condvar::new(),
        }
    }

    /// Sleep up to `timeout`. Returns `true` once shutdown is requested.
    fn wait(&self, timeout: Duration) -> bool {
        let mut flag = self.flag.lock();
        if *flag {
            return true;
        }
        self.wakeup.wait_for(&mut flag, timeout);
        *flag
    }

    fn trigger(&self) {
        *self.flag.lock() = true;
        self.wakeup.notify_all();
    }
}

/// Handle over the two maintenance threads of one engine.
pub(crate) struct MaintenanceWorkers {
    signal: Arc<ShutdownSignal>,
    handles: Vec<JoinHandle<()>>,
}

impl MaintenanceWorkers {
    /// Spawn the cleanup and self-tuning workers.
    pub(crate) fn start(shared: Arc<Shared>) -> Self {
        let signal = Arc::new(ShutdownSignal::new());
        let handles = vec![
            spawn_worker(
                Arc::clone(&shared),
                Arc::clone(&signal),
                "cleanup",
                |shared| shared.state.lock().config.cleanup_interval,
                |shared| {
                    cleanup_pass(shared);
                },
            ),
            spawn_worker(
                Arc::clone(&shared),
                Arc::clone(&signal),
                "tuning",
                |shared| shared.state.lock().config.tuning_interval,
                tuning_pass,
            ),
        ];
        Self { signal, handles }
    }

    /// Stop both workers and wait for them to exit.
    pub(crate) fn shutdown(self) {
        self.signal.trigger();
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn spawn_worker(
    shared: Arc<Shared>,
    signal: Arc<ShutdownSignal>,
    name: &'static str,
    interval: fn(&Shared) -> Duration,
    pass: fn(&Shared),
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            if signal.wait(interval(&shared)) {
                break;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| pass(&shared)));
            if outcome.is_err() {
                warn!(pass = name, "maintenance pass panicked; timer keeps running");
            }
        }
    })
}

/// Bulk-delete every expired entry. Returns how many were removed.
pub(crate) fn cleanup_pass(shared: &Shared) -> usize {
    let mut state = shared.state.lock();
    let purged = state.store.purge_expired(Instant::now());
    if purged > 0 {
        debug!(purged, "purged expired cache entries");
    }
    purged
}

/// One self-tuning pass: preload bookkeeping, slow-operation expiry
/// extension and hit-rate driven growth of `max_entries` / `base_ttl`.
pub(crate) fn tuning_pass(shared: &Shared) {
    let mut state = shared.state.lock();
    let now = Instant::now();

    // Frequent keys that are not currently cached would benefit from
    // precomputation. Counted only; nothing is precomputed.
    let frequent = state.frequency.top_n(PRELOAD_CANDIDATE_KEYS);
    let uncached = frequent
        .iter()
        .filter(|(key, _)| !state.store.contains_live(key, now))
        .count() as u64;
    state.counters.preload_candidates += uncached;

    // Entries produced by the slowest operations get extra lifetime.
    let extra = state.config.heavy_ttl.saturating_sub(state.config.base_ttl);
    if !extra.is_zero() {
        let slowest = state.perf.top_slowest(SLOW_OPERATIONS_EXTENDED);
        for record in &slowest {
            let prefix = key::operation_prefix(&record.provider, &record.operation);
            state.store.extend_expiry_prefix(&prefix, extra, now);
        }
    }

    // Retune capacity and TTL from the observed hit rate. An idle engine
    // has no observed rate, so nothing is changed.
    if state.counters.total_requests() == 0 {
        return;
    }
    let hit_rate = state.counters.hit_rate();
    if hit_rate < LOW_HIT_RATE_PCT && state.config.max_entries < MAX_ENTRIES_CEILING {
        let current = state.config.max_entries;
        let grown = (current + (current / 5).max(1)).min(MAX_ENTRIES_CEILING);
        debug!(hit_rate, from = current, to = grown, "low hit rate, growing cache capacity");
        state.config.max_entries = grown;
    } else if hit_rate > HIGH_HIT_RATE_PCT {
        // heavy_ttl stays the longer of the two TTLs, so base growth is
        // capped by it as well as by the hard ceiling.
        let ceiling = BASE_TTL_CEILING.min(state.config.heavy_ttl);
        let current = state.config.base_ttl;
        if current < ceiling {
            let grown = current.mul_f64(1.1).min(ceiling);
            debug!(hit_rate, from = ?current, to = ?grown, "high hit rate, growing base TTL");
            state.config.base_ttl = grown;
        }
    }
}
