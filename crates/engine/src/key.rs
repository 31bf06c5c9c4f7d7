//! Deterministic cache-key encoding.
//!
//! A cache key is a total, deterministic function of `(provider, operation,
//! args)`: the same inputs by value always produce the same key, across
//! processes and library versions. Keys have the layout
//! `provider:operation:<canonical-json-of-args>`, which is what makes
//! provider-scoped cache clearing a plain prefix match.
//!
//! The canonical writer serializes argument lists positionally and object
//! fields in sorted order. Relying on the JSON library's own map ordering
//! would make keys depend on feature flags and insertion order; the walker
//! here keeps determinism explicit.

use serde_json::Value;

/// Encode a full cache key for `(provider, operation, args)`.
#[must_use]
pub fn encode(provider: &str, operation: &str, args: &[Value]) -> String {
    let mut key = String::with_capacity(provider.len() + operation.len() + 2 + args.len() * 8);
    key.push_str(provider);
    key.push(':');
    key.push_str(operation);
    key.push(':');
    key.push_str(&encode_args(args));
    key
}

/// Encode only the argument list. Used by the memoization layer, which is
/// already scoped by provider and operation.
#[must_use]
pub fn encode_args(args: &[Value]) -> String {
    let mut out = String::new();
    out.push('[');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_canonical(arg, &mut out);
    }
    out.push(']');
    out
}

/// The key prefix owned by a provider, used for scoped cache clearing.
#[must_use]
pub fn provider_prefix(provider: &str) -> String {
    format!("{provider}:")
}

/// The key prefix owned by one `provider.operation` pair.
#[must_use]
pub fn operation_prefix(provider: &str, operation: &str) -> String {
    format!("{provider}:{operation}:")
}

/// Write `value` as canonical JSON: object fields sorted, array order
/// preserved, scalar formatting delegated to serde_json.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json's Display for numbers and strings is already stable
        // (shortest round-trip floats, escaped strings).
        Value::Number(_) | Value::String(_) => out.push_str(&value.to_string()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(fields) => {
            let mut names: Vec<&String> = fields.keys().collect();
            names.sort_unstable();
            out.push('{');
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*name).clone()).to_string());
                out.push(':');
                write_canonical(&fields[*name], out);
            }
            out.push('}');
        }
    }
}
