//! Ordering of cursor values

use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;

/// Compare two cursor values
///
/// Numbers compare numerically, RFC 3339 datetimes chronologically and other
/// strings lexicographically. Returns `None` for values of different kinds.
pub fn compare_cursor_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        _ => None,
    }
}
