//! A single timestamped, duration-scoped record of parameter values.
//!
//! Observations are plain ordered JSON objects: keys keep the order in which
//! they were first written, which keeps emitted documents stable.

use serde_json::{Map, Value};

pub type Observation = Map<String, Value>;

pub const TIMESTAMP: &str = "timestamp";
pub const DURATION: &str = "duration";

/// Numeric view of a field. Strings that parse as numbers are accepted the
/// way manifests often quote them.
pub fn number(observation: &Observation, key: &str) -> Option<f64> {
    match observation.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Wrap an f64 as a JSON value. Non-finite results become `null`.
pub fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Fill `input` with `defaults` for every key that is absent or null.
/// Values present on the input always win.
pub fn merge_defaults(defaults: &Observation, input: &Observation) -> Observation {
    let mut merged = input.clone();
    for (key, value) in defaults {
        match merged.get(key) {
            Some(existing) if !existing.is_null() => {}
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

/// Render a value as a grouping key. Keys compare as text, so the number
/// `1` and the string `"1"` name the same group.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
