//! Canonical JSON rendering for deterministic plan output.
//!
//! A rendered plan is compared, diffed, and hashed by external tooling,
//! so two renders of the same topology must be byte-identical. All object
//! keys are sorted alphabetically; array order (the declaration order) is
//! preserved.

use crate::error::ComposeError;
use std::collections::BTreeMap;

/// Serialize to canonical JSON with sorted keys.
pub fn to_canonical_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ComposeError> {
    let json_value = serde_json::to_value(value)
        .map_err(|e| ComposeError::Render(format!("json error: {}", e)))?;
    let sorted = sort_json_value(json_value);
    serde_json::to_string(&sorted).map_err(|e| ComposeError::Render(format!("json error: {}", e)))
}

/// Recursively sort all object keys alphabetically.
///
/// BTreeMap gives us sorted keys for free. Arrays and scalars pass through unchanged.
fn sort_json_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<String, serde_json::Value> = map
                .into_iter()
                .map(|(k, v)| (k, sort_json_value(v)))
                .collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(sort_json_value).collect())
        }
        other => other,
    }
}
