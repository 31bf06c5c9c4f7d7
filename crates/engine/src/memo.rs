//! Per-provider memoization, independent of the main cache store.
//!
//! Memoized values have no TTL: once computed they live until the engine is
//! torn down. This sits underneath the dispatcher's miss path, so a memo hit
//! skips the invocation entirely and is counted as an optimized calculation
//! rather than a cache hit.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

/// Which operations of a provider are memoized.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MemoScope {
    /// Every operation the provider exposes.
    All,
    /// Only the listed operations.
    Operations(HashSet<String>),
}

/// TTL-less result store, scoped per provider and operation, keyed by
/// encoded argument lists.
#[derive(Debug, Default)]
pub(crate) struct MemoStore {
    scopes: HashMap<String, MemoScope>,
    values: HashMap<(String, String), HashMap<String, Value>>,
}

impl MemoStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enable memoization for `provider`, either for every operation
    /// (`None`) or an explicit list. Re-enabling widens or replaces the
    /// previous scope but keeps already-stored values.
    pub(crate) fn enable(&mut self, provider: &str, operations: Option<&[String]>) {
        let scope = match operations {
            None => MemoScope::All,
            Some(names) => MemoScope::Operations(names.iter().cloned().collect()),
        };
        self.scopes.insert(provider.to_owned(), scope);
    }

    /// Whether `provider.operation` results should be memoized.
    pub(crate) fn is_enabled(&self, provider: &str, operation: &str) -> bool {
        match self.scopes.get(provider) {
            None => false,
            Some(MemoScope::All) => true,
            Some(MemoScope::Operations(names)) => names.contains(operation),
        }
    }

    /// Look up a memoized value.
    pub(crate) fn get(&self, provider: &str, operation: &str, args_key: &str) -> Option<Value> {
        self.values
            .get(&(provider.to_owned(), operation.to_owned()))
            .and_then(|by_args| by_args.get(args_key))
            .cloned()
    }

    /// Store a computed value.
    pub(crate) fn store(&mut self, provider: &str, operation: &str, args_key: String, value: Value) {
        self.values
            .entry((provider.to_owned(), operation.to_owned()))
            .or_default()
            .insert(args_key, value);
    }

    /// Number of memoized values across all scopes.
    pub(crate) fn len(&self) -> usize {
        self.values.values().map(HashMap::len).sum()
    }

    /// Drop every scope and value.
    pub(crate) fn clear(&mut self) {
        self.scopes.clear();
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_by_default() {
        let memo = MemoStore::new();
        assert!(!memo.is_enabled("math", "square"));
        assert!(memo.get("math", "square", "[4]").is_none());
    }

    #[test]
    fn enable_all_covers_every_operation() {
        let mut memo = MemoStore::new();
        memo.enable("math", None);
        assert!(memo.is_enabled("math", "square"));
        assert!(memo.is_enabled("math", "anything"));
        assert!(!memo.is_enabled("other", "square"));
    }

    #[test]
    fn enable_list_covers_only_named_operations() {
        let mut memo = MemoStore::new();
        memo.enable("math", Some(&["square".to_owned()]));
        assert!(memo.is_enabled("math", "square"));
        assert!(!memo.is_enabled("math", "cube"));
    }

    #[test]
    fn store_and_get_are_scoped() {
        let mut memo = MemoStore::new();
        memo.enable("math", None);
        memo.store("math", "square", "[4]".into(), json!(16));

        assert_eq!(memo.get("math", "square", "[4]"), Some(json!(16)));
        assert!(memo.get("math", "square", "[5]").is_none());
        assert!(memo.get("math", "cube", "[4]").is_none());
        assert!(memo.get("other", "square", "[4]").is_none());
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn re_enabling_keeps_stored_values() {
        let mut memo = MemoStore::new();
        memo.enable("math", Some(&["square".to_owned()]));
        memo.store("math", "square", "[4]".into(), json!(16));

        memo.enable("math", None);
        assert_eq!(memo.get("math", "square", "[4]"), Some(json!(16)));
    }

    #[test]
    fn clear_drops_scopes_and_values() {
        let mut memo = MemoStore::new();
        memo.enable("math", None);
        memo.store("math", "square", "[4]".into(), json!(16));

        memo.clear();
        assert!(!memo.is_enabled("math", "square"));
        assert_eq!(memo.len(), 0);
    }
}
