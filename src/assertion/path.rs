//! Dot-path extraction over structured output values

use serde_json::Value;

/// Extract a value by dot-separated path.
///
/// Object keys and numeric list indexes are supported. A missing or
/// non-traversable path yields `Value::Null`, never an error.
pub fn get_by_path(value: &Value, path: &str) -> Value {
    if path.is_empty() {
        return value.clone();
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => v,
                None => return Value::Null,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(v) => v,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }

    current.clone()
}
