//! Convenience re-exports for engine users.
//!
//! ```rust
//! use recalc_engine::prelude::*;
//! ```

pub use crate::batch::BatchTicket;
pub use crate::config::EngineConfig;
pub use crate::engine::{CalcOptions, CalcPriority, CalculationEngine};
pub use crate::error::{EngineError, EngineResult};
pub use crate::provider::{ComputeProvider, FnProvider};
pub use crate::stats::{CacheStats, ExtendedStats};
