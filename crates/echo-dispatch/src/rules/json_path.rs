//! Dot-path extraction over decoded JSON bodies.

use serde_json::Value;

/// Walk a decoded JSON object following dot-separated segments
/// (`a.b.c` reads `data["a"]["b"]["c"]`) and return the leaf as a string.
///
/// Only object maps are navigable; hitting an array, scalar, or missing key
/// mid-path yields an empty string. Leaf stringification: strings verbatim,
/// numbers and booleans via their canonical formatting, `null` empty,
/// objects and arrays re-serialized as JSON.
pub fn nested_value(data: &Value, key: &str) -> String {
    let mut current = data;

    for part in key.split('.') {
        match current {
            Value::Object(map) => match map.get(part) {
                Some(next) => current = next,
                None => return String::new(),
            },
            _ => return String::new(),
        }

        if current.is_null() {
            return String::new();
        }
    }

    stringify_leaf(current)
}

fn stringify_leaf(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
