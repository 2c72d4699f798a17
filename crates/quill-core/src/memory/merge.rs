//! Merge policy for long-term memory records.
//!
//! List fields are concatenated with order-preserving de-duplication,
//! object fields are shallow-merged, scalars are overwritten by the most
//! recent value, and empty/null incoming values are skipped so an
//! extraction that found nothing never downgrades existing facts.
//! The merge is idempotent: applying the same payload twice equals
//! applying it once.

use serde_json::{Map, Value};

/// Merge `new` into `existing` and return the combined record.
///
/// Both values are expected to be JSON objects; a non-object `existing`
/// is replaced wholesale, and a non-object `new` overwrites.
pub fn merge_memory(existing: &Value, new: &Value) -> Value {
    let (Some(existing_map), Some(new_map)) = (existing.as_object(), new.as_object()) else {
        return new.clone();
    };

    let mut result: Map<String, Value> = existing_map.clone();

    for (key, new_value) in new_map {
        if is_empty(new_value) {
            continue;
        }

        match (result.get(key), new_value) {
            // Key absent: take the new value.
            (None, _) => {
                result.insert(key.clone(), new_value.clone());
            }
            // Lists: concatenate, de-duplicate preserving first occurrence.
            (Some(Value::Array(old_items)), Value::Array(new_items)) => {
                let mut combined = old_items.clone();
                for item in new_items {
                    if !combined.contains(item) {
                        combined.push(item.clone());
                    }
                }
                result.insert(key.clone(), Value::Array(combined));
            }
            // Objects: shallow-merge, newer entries win.
            (Some(Value::Object(old_obj)), Value::Object(new_obj)) => {
                let mut merged = old_obj.clone();
                for (k, v) in new_obj {
                    merged.insert(k.clone(), v.clone());
                }
                result.insert(key.clone(), Value::Object(merged));
            }
            // Scalars (or mismatched shapes): most recent wins.
            _ => {
                result.insert(key.clone(), new_value.clone());
            }
        }
    }

    Value::Object(result)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
