//! Tolerant readers for loosely-typed upstream JSON.
//!
//! Upstream payloads are inconsistent: the same field may appear under
//! several names, numbers may arrive as strings, and anything may be
//! missing. These helpers return `None`/empty instead of failing so a bad
//! field never costs the whole record.

use serde_json::Value;

/// First present, non-empty string among `keys`. Numbers are stringified.
pub fn first_str(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| as_text(item.get(key)?))
}

/// String at a JSON pointer such as `/ItemInfo/Title/DisplayValue`.
pub fn str_at(item: &Value, pointer: &str) -> Option<String> {
    as_text(item.pointer(pointer)?)
}

/// First finite number among `keys`. Numeric strings are accepted.
pub fn first_number(item: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| as_number(item.get(key)?))
}

pub fn number_at(item: &Value, pointer: &str) -> Option<f64> {
    as_number(item.pointer(pointer)?)
}

/// All non-empty strings in the array under `key`.
pub fn string_list(item: &Value, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(as_text).collect())
        .unwrap_or_default()
}

/// First array found among `keys`.
pub fn first_array<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| payload.get(key)?.as_array())
}

/// Case-insensitive substring test used to normalise stock text.
pub fn contains_marker(text: &str, marker: &str) -> bool {
    text.to_lowercase().contains(&marker.to_lowercase())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('$').parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
