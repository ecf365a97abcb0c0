//! 🔢 Deterministic sequencer — same batch in, same order out, whatever order it arrived in.
//!
//! 🧠 Knowledge graph:
//! - Sort key: compact JSON with object keys sorted at every depth, non-ASCII verbatim
//! - Stable sort, so items with identical keys keep their relative order
//! - Used by: `supervisors::enqueuer` right before dispatch
//!
//! Keys are sorted by hand rather than trusting the map type, so the key stays canonical
//! even if someone flips on serde_json's `preserve_order` somewhere in the dependency tree. 🦆

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// 🔑 Canonical serialization: sorted keys, no whitespace, unicode untouched.
pub(crate) fn canonical_key<T: Serialize>(item: &T) -> String {
    match serde_json::to_value(item) {
        Ok(value) => {
            let mut out = String::new();
            write_canonical(&value, &mut out);
            out
        }
        Err(err) => {
            // -- 💀 only reachable for types with non-string map keys. they sort first.
            warn!(error = %err, "🔢 item could not be serialized for ordering");
            String::new()
        }
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, inner)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(inner, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, inner) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(inner, out);
            }
            out.push(']');
        }
        // -- scalars: serde_json's compact form already keeps non-ASCII as-is
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// 🔢 `order(items)`: sort a batch by its canonical serialization.
pub(crate) fn order<T: Serialize>(items: Vec<T>) -> Vec<T> {
    let mut keyed: Vec<(String, T)> = items
        .into_iter()
        .map(|item| (canonical_key(&item), item))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, item)| item).collect()
}
