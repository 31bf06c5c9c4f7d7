//! Error types for the calculation engine.
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use thiserror::Error;

/// Error type for all engine operations.
///
/// Caller mistakes (unknown provider, unknown operation, bad registration)
/// are distinguished from computation failures so call sites can decide
/// whether an error is worth surfacing to a user or fixing in code. The
/// engine itself never retries; retry policy is the caller's concern.
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Registration was rejected before anything was stored.
    #[error("invalid registration: {reason}")]
    InvalidRegistration { reason: String },

    /// No provider is registered under the requested name.
    #[error("provider not registered: {provider}")]
    ProviderNotRegistered { provider: String },

    /// The provider exists but does not expose the requested operation.
    #[error("operation not found: {provider}.{operation}")]
    OperationNotFound {
        provider: String,
        operation: String,
    },

    /// A provider rejected its positional arguments (arity, type, range).
    #[error("invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: String, reason: String },

    /// A provider's computation failed. Propagated to the caller unmodified
    /// after being logged with provider/operation context.
    #[error("computation failed in {operation}: {message}")]
    Computation { operation: String, message: String },

    /// A batch-variant operation returned a result list whose length does
    /// not match the number of coalesced requests.
    #[error(
        "batch result shape mismatch for {operation}: expected {expected} results, got {actual}"
    )]
    BatchShape {
        operation: String,
        expected: usize,
        actual: usize,
    },

    /// The engine was destroyed while the request was still pending.
    #[error("engine closed")]
    EngineClosed,

    /// Configuration was rejected by validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl EngineError {
    /// Create an invalid registration error.
    pub fn invalid_registration(reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            reason: reason.into(),
        }
    }

    /// Create an unknown-provider error.
    pub fn provider_not_registered(provider: impl Into<String>) -> Self {
        Self::ProviderNotRegistered {
            provider: provider.into(),
        }
    }

    /// Create an unknown-operation error.
    pub fn operation_not_found(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::OperationNotFound {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// Create an invalid-arguments error. Intended for providers to signal
    /// arity or type misuse of their operations.
    pub fn invalid_arguments(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a computation failure. Intended for providers.
    pub fn computation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Computation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Get error code for categorization.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRegistration { .. } => "CALC:REGISTRY:INVALID",
            Self::ProviderNotRegistered { .. } => "CALC:REGISTRY:UNKNOWN_PROVIDER",
            Self::OperationNotFound { .. } => "CALC:DISPATCH:UNKNOWN_OPERATION",
            Self::InvalidArguments { .. } => "CALC:ARGS:INVALID",
            Self::Computation { .. } => "CALC:COMPUTE:FAILED",
            Self::BatchShape { .. } => "CALC:BATCH:SHAPE",
            Self::EngineClosed => "CALC:ENGINE:CLOSED",
            Self::InvalidConfig { .. } => "CALC:CONFIG:INVALID",
        }
    }

    /// Returns `true` if the error is a caller mistake rather than a
    /// computation or engine failure.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegistration { .. }
                | Self::ProviderNotRegistered { .. }
                | Self::OperationNotFound { .. }
                | Self::InvalidArguments { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Returns `true` if the error originated inside a provider's
    /// computation (including batch execution).
    #[must_use]
    pub fn is_computation_error(&self) -> bool {
        matches!(self, Self::Computation { .. } | Self::BatchShape { .. })
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = core::result::Result<T, EngineError>;
