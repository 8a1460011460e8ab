//! Prioritized field lookup for loosely-structured backend payloads.
//!
//! Analysis results and quantitative snapshots come from several producers
//! that disagree on spelling (`total_tile_area_m2` vs `totalAreaM2`). Every
//! synonym lookup in the crate goes through [`pick`] and friends with an
//! ordered candidate list; the first candidate that is present wins.

use serde_json::Value;

/// Walk a dotted path (`"summary.total_area_m2"`) into a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Return the first candidate path that resolves to a non-null value.
pub fn pick<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|v| !v.is_null())
}

/// Interpret a JSON value as a finite number. Numeric strings are accepted
/// because several producers serialize floats as text.
pub fn as_finite(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// First candidate that resolves to a finite number.
pub fn pick_number(value: &Value, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(as_finite)
}

/// First candidate that resolves to a non-empty string. Numbers are
/// stringified so numeric ids still key correctly.
pub fn pick_string(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(as_key_string)
}

pub fn pick_bool(value: &Value, candidates: &[&str]) -> Option<bool> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
}

pub fn pick_array<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Vec<Value>> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find_map(Value::as_array)
}

pub fn as_key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize a percentage-like number onto the 0–100 scale.
///
/// Values `<= 1` are read as fractions and multiplied by 100; larger values
/// are taken as already being percentages. The result is clamped to
/// `[0, 100]`.
///
/// Known ambiguity: a genuine whole-percent value below 1 (e.g. `0.5`
/// meaning half a percent) is indistinguishable from a fraction and will be
/// scaled to 50.
pub fn normalize_percentage(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = if value <= 1.0 { value * 100.0 } else { value };
    Some(scaled.clamp(0.0, 100.0))
}

pub fn pick_percentage(value: &Value, candidates: &[&str]) -> Option<f64> {
    pick_number(value, candidates).and_then(normalize_percentage)
}
