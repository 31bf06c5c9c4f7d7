//! Computation providers and their registry.
//!
//! A provider is a caller-owned object exposing named operations over
//! positional JSON arguments. The engine never inspects a provider beyond
//! this trait: operations are declared up front and invoked by name, so an
//! unknown operation is rejected with [`EngineError::OperationNotFound`]
//! instead of failing somewhere inside a dynamic dispatch.
//!
//! A batch-capable provider exposes a second operation named
//! `<operation>_batch` taking a single argument: the ordered list of
//! argument-sets. The coalescer discovers it through [`ComputeProvider::has_operation`],
//! so batching needs no extra trait machinery.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// A named computation source.
///
/// Implementations must be cheap to call concurrently; the engine holds a
/// shared reference and never mutates provider state.
pub trait ComputeProvider: Send + Sync + 'static {
    /// Names of the operations this provider exposes.
    fn operations(&self) -> Vec<String>;

    /// Whether `operation` is callable on this provider.
    fn has_operation(&self, operation: &str) -> bool {
        self.operations().iter().any(|name| name == operation)
    }

    /// Invoke `operation` with positional arguments.
    ///
    /// Callers that need caching correctness must keep operations
    /// deterministic and side-effect free; the engine does not check.
    fn invoke(&self, operation: &str, args: &[Value]) -> EngineResult<Value>;
}

type Operation = Box<dyn Fn(&[Value]) -> EngineResult<Value> + Send + Sync>;

/// A [`ComputeProvider`] built from named closures.
///
/// The common way to register computations without writing a dedicated
/// provider type:
///
/// ```rust
/// use recalc_engine::provider::{ComputeProvider, FnProvider};
/// use serde_json::json;
///
/// let math = FnProvider::new().operation("square", |args| {
///     let x = args[0].as_f64().unwrap_or(0.0);
///     Ok(json!(x * x))
/// });
///
/// assert!(math.has_operation("square"));
/// assert_eq!(math.invoke("square", &[json!(4)]).unwrap(), json!(16.0));
/// ```
#[derive(Default)]
pub struct FnProvider {
    operations: HashMap<String, Operation>,
}

impl FnProvider {
    /// Create a provider with no operations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation. Replaces any existing operation with the same name.
    #[must_use = "builder methods must be chained or built"]
    pub fn operation<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Box::new(f));
        self
    }
}

impl ComputeProvider for FnProvider {
    fn operations(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    fn invoke(&self, operation: &str, args: &[Value]) -> EngineResult<Value> {
        match self.operations.get(operation) {
            Some(f) => f(args),
            None => Err(EngineError::operation_not_found("<fn>", operation)),
        }
    }
}

impl std::fmt::Debug for FnProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Name → provider map with last-write-wins registration.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ComputeProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `name`. Overwrites any prior registration
    /// for that name. Fails with [`EngineError::InvalidRegistration`] if the
    /// name is empty or blank.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ComputeProvider>,
    ) -> EngineResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::invalid_registration(
                "provider name must not be empty",
            ));
        }
        debug!(provider = %name, operations = provider.operations().len(), "registered provider");
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Look up a provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ComputeProvider>> {
        self.providers.get(name).cloned()
    }

    /// Check whether a provider is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Names of all registered providers.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.providers.clear();
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("count", &self.providers.len())
            .field("names", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn math_provider() -> Arc<dyn ComputeProvider> {
        Arc::new(FnProvider::new().operation("square", |args| {
            let x = args[0].as_f64().unwrap_or(0.0);
            Ok(json!(x * x))
        }))
    }

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("anything").is_none());
    }

    #[test]
    fn register_and_get() {
        let mut registry = ProviderRegistry::new();
        registry.register("math", math_provider()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("math"));
        let provider = registry.get("math").unwrap();
        assert!(provider.has_operation("square"));
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut registry = ProviderRegistry::new();
        let err = registry.register("", math_provider()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRegistration { .. }));

        let err = registry.register("   ", math_provider()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRegistration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ProviderRegistry::new();
        registry.register("p", math_provider()).unwrap();
        registry
            .register(
                "p",
                Arc::new(FnProvider::new().operation("cube", |args| {
                    let x = args[0].as_f64().unwrap_or(0.0);
                    Ok(json!(x * x * x))
                })),
            )
            .unwrap();

        assert_eq!(registry.len(), 1);
        let provider = registry.get("p").unwrap();
        assert!(provider.has_operation("cube"));
        assert!(!provider.has_operation("square"));
    }

    #[test]
    fn fn_provider_lists_its_operations() {
        let provider = FnProvider::new()
            .operation("a", |_| Ok(json!(null)))
            .operation("b", |_| Ok(json!(null)));

        let mut operations = provider.operations();
        operations.sort();
        assert_eq!(operations, vec!["a", "b"]);
        assert!(provider.has_operation("a"));
        assert!(!provider.has_operation("c"));
    }

    #[test]
    fn fn_provider_rejects_unknown_operations() {
        let provider = FnProvider::new();
        let err = provider.invoke("missing", &[]).unwrap_err();
        assert!(matches!(err, EngineError::OperationNotFound { .. }));
    }

    #[test]
    fn provider_errors_pass_through() {
        let provider = FnProvider::new().operation("fail", |_| {
            Err(EngineError::computation("fail", "boom"))
        });
        let err = provider.invoke("fail", &[]).unwrap_err();
        assert_eq!(err, EngineError::computation("fail", "boom"));
    }

    #[test]
    fn debug_formats_are_informative() {
        let mut registry = ProviderRegistry::new();
        registry.register("math", math_provider()).unwrap();
        let debug = format!("{registry:?}");
        assert!(debug.contains("ProviderRegistry"));
        assert!(debug.contains("math"));
    }
}
