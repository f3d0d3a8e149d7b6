//! Shared value parsing utilities for transaction sources.
//!
//! Government APIs are loose about types: the same field may arrive as a
//! JSON number in one response and as a padded, comma-grouped string
//! (`" 82,500"`) in the next. These helpers accept both.

use serde_json::Value;

/// Parses an amount string, ignoring whitespace and thousands separators.
/// Returns `None` for empty or non-finite input.
#[must_use]
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads a finite number from a JSON number or an amount string.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Reads a whole number from a JSON number or a numeric string
/// (`"03"` is accepted, `"3.5"` is not).
#[must_use]
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.fract() == 0.0 && v.abs() < 1e15)
                .map(|v| {
                    #[allow(clippy::cast_possible_truncation)]
                    let whole = v as i64;
                    whole
                })
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Reads a trimmed, non-empty string. Numbers are rendered as text so
/// numeric building names survive.
#[must_use]
pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Follows a dot-separated path (`"response.body.items"`) into a JSON value.
#[must_use]
pub fn value_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}
