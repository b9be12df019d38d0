//! Defensive accessors over loosely typed JSON objects.
//!
//! Each helper checks presence, coerces the value to the wanted type and treats
//! blank strings as absent. Key lists are tried in order; the first usable value wins.
use pinscrape_common::serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Non-blank string, or a number rendered as text.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn first_text(object: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(text))
}

pub fn first_object<'a>(object: &'a Object, keys: &[&str]) -> Option<&'a Object> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_object))
}

/// Non-negative integer from a number or a numeric string.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(s) => s.trim().replace(',', "").parse::<u64>().ok(),
        _ => None,
    }
}

pub fn first_count(object: &Object, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| object.get(*key).and_then(count))
}
