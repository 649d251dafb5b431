//! Resource payload values
//!
//! Payloads are insertion-ordered `String -> serde_json::Value` maps. The
//! workspace enables serde_json's `preserve_order` feature, so iteration
//! order is the order fields arrived in.

use serde_json::Value;

/// Ordered property map of a resource payload
pub type Properties = serde_json::Map<String, Value>;

/// Read the `href` property, if present and a non-empty string
pub fn get_href(properties: &Properties) -> Option<&str> {
    properties
        .get("href")
        .and_then(Value::as_str)
        .filter(|href| !href.is_empty())
}

/// Convert a property to an integer.
///
/// Accepts JSON integers, floats with no fractional part, and numeric strings.
pub fn get_i64(properties: &Properties, key: &str) -> Option<i64> {
    match properties.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
