use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::model::Record;
use crate::query::values::json_eq;

/// Partial deep match: every field of `pattern` must be matched by `record`
///
/// Nested objects match partially too; a list pattern matches when each of
/// its elements matches some element of the target list.
pub fn is_match(record: &Record, pattern: &Map<String, Value>) -> bool {
    pattern
        .iter()
        .all(|(k, p)| record.get(k).map(|v| value_matches(v, p)).unwrap_or(false))
}

fn value_matches(target: &Value, pattern: &Value) -> bool {
    match (target, pattern) {
        (Value::Object(t), Value::Object(p)) => p
            .iter()
            .all(|(k, pv)| t.get(k).map(|tv| value_matches(tv, pv)).unwrap_or(false)),
        (Value::Array(t), Value::Array(p)) => p
            .iter()
            .all(|pv| t.iter().any(|tv| value_matches(tv, pv))),
        _ => json_eq(target, pattern),
    }
}

fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as i64),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.timestamp_millis()),
        _ => None,
    }
}

/// Default listing order: ascending `_created_at`
///
/// RFC 3339 strings and epoch milliseconds compare as instants; other
/// strings compare as text. Records where either value is missing compare
/// equal.
pub fn by_created_at(a: &Record, b: &Record) -> Ordering {
    let (Some(x), Some(y)) = (a.created_at(), b.created_at()) else {
        return Ordering::Equal;
    };
    match (timestamp_millis(x), timestamp_millis(y)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => match (x.as_str(), y.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}

/// Stable merge sort that tolerates comparators which are not total orders
/// (such as [`by_created_at`], where a missing value equals everything)
pub fn stable_sort_by<T, F>(mut items: Vec<T>, cmp: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let mut left = stable_sort_by(items, cmp).into_iter().peekable();
    let mut right = stable_sort_by(right, cmp).into_iter().peekable();

    let mut out = Vec::with_capacity(left.len() + right.len());
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let next = if cmp(b, a) == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        out.extend(next);
    }
    out.extend(left);
    out.extend(right);
    out
}
