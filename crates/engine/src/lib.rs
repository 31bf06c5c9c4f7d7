//! # recalc-engine
//!
//! Adaptive computation cache and dispatch engine.
//!
//! Callers register named computation providers; the engine memoizes and
//! caches their results with adaptive TTL and value-weighted eviction,
//! coalesces concurrent batchable requests into single invocations, and
//! continuously retunes its own cache-size/TTL parameters from the
//! observed hit rate.
//!
//! ## Core pieces
//!
//! - [`CalculationEngine`] — the dispatcher tying everything together
//! - [`ComputeProvider`] / [`FnProvider`] — the capability interface
//!   callers register their computations through
//! - [`EngineConfig`] — capacity, TTLs and maintenance intervals, with
//!   hard ceilings the self-tuning pass never crosses
//! - [`EvictionPolicy`] — age-based and value-score-based strategies
//! - [`BatchTicket`] — deferred result of a coalesced batchable request
//!
//! ## Quick start
//!
//! ```rust
//! use recalc_engine::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let engine = CalculationEngine::new();
//! engine
//!     .register(
//!         "math",
//!         Arc::new(FnProvider::new().operation("square", |args| {
//!             let x = args[0].as_f64().unwrap_or(0.0);
//!             Ok(json!(x * x))
//!         })),
//!     )
//!     .unwrap();
//!
//! // First call computes; the second is served from the cache.
//! assert_eq!(engine.calculate("math", "square", &[json!(4)]).unwrap(), json!(16.0));
//! assert_eq!(engine.calculate("math", "square", &[json!(4)]).unwrap(), json!(16.0));
//! assert_eq!(engine.cache_stats().hits, 1);
//! ```
//!
//! Caching assumes deterministic, side-effect-free operations; the engine
//! does not enforce purity, persist entries across restarts, or retry
//! failed computations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Bounded TTL cache store and its eviction policies.
pub mod cache;
/// Engine configuration and the hard ceilings for self-tuning.
pub mod config;
/// The calculation engine: registration, dispatch, batching, teardown.
pub mod engine;
/// Error taxonomy for registration, dispatch and batch execution.
pub mod error;
/// Deterministic cache-key encoding.
pub mod key;
/// Convenience re-exports.
pub mod prelude;
/// Computation providers and their registry.
pub mod provider;
/// Request counters, frequency tracking and execution-time records.
pub mod stats;

mod batch;
mod maintenance;
mod memo;

// ── Public re-exports ───────────────────────────────────────────────────────

pub use batch::BatchTicket;
pub use cache::{CacheEntry, CacheStore, EvictionPolicy};
pub use config::{BASE_TTL_CEILING, EngineConfig, MAX_ENTRIES_CEILING};
pub use engine::{CalcOptions, CalcPriority, CalculationEngine};
pub use error::{EngineError, EngineResult};
pub use provider::{ComputeProvider, FnProvider, ProviderRegistry};
pub use stats::{CacheStats, ExtendedStats};
