use serde::Serialize;
use serde_json::Value;

use crate::errors::{FlatstoreError, Result};
use crate::model::Record;

/// Limit/offset window; `limit == 0` means no limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Paging {
    pub limit: usize,
    pub offset: usize,
}

impl Paging {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Parse caller-supplied values (numbers or numeric strings)
    ///
    /// Missing or null values default to 0.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPaging` for negative, fractional, non-finite,
    /// out-of-range or non-numeric input. Values are never clamped.
    pub fn from_values(limit: Option<&Value>, offset: Option<&Value>) -> Result<Self> {
        Ok(Self {
            limit: parse_count("limit", limit)?,
            offset: parse_count("offset", offset)?,
        })
    }

    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let take = if self.limit == 0 {
            usize::MAX
        } else {
            self.limit
        };
        rows.into_iter().skip(self.offset).take(take).collect()
    }
}

fn parse_count(name: &str, value: Option<&Value>) -> Result<usize> {
    let invalid = |v: &Value| FlatstoreError::InvalidPaging {
        reason: format!("{} must be a non-negative integer, got {}", name, v),
    };
    let number = match value {
        None | Some(Value::Null) => return Ok(0),
        Some(v @ Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(v))?,
        Some(v @ Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(v))?,
        Some(v) => return Err(invalid(v)),
    };
    // usize::MAX as f64 rounds up, so equality is already out of range
    if !number.is_finite()
        || number < 0.0
        || number.fract() != 0.0
        || number >= usize::MAX as f64
    {
        let shown = value.cloned().unwrap_or(Value::Null);
        return Err(invalid(&shown));
    }
    Ok(number as usize)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// Matching rows before paging
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// One page of `find_all`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub rows: Vec<Record>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_values() {
        assert_eq!(Paging::from_values(None, None).unwrap(), Paging::default());
        assert_eq!(
            Paging::from_values(Some(&json!(10)), Some(&json!("5"))).unwrap(),
            Paging::new(10, 5)
        );
        assert_eq!(
            Paging::from_values(Some(&json!(2.0)), Some(&Value::Null)).unwrap(),
            Paging::new(2, 0)
        );
    }

    #[test]
    fn test_invalid_values_are_errors() {
        for bad in [
            json!(-1),
            json!(1.5),
            json!("abc"),
            json!("inf"),
            json!(true),
            json!([1]),
            json!(1e20),
            json!("1e300"),
        ] {
            let err = Paging::from_values(Some(&bad), None).unwrap_err();
            assert!(matches!(err, FlatstoreError::InvalidPaging { .. }), "{}", bad);
        }
        assert!(Paging::from_values(None, Some(&json!(-3))).is_err());
    }

    #[test]
    fn test_apply() {
        let rows: Vec<u32> = (1..=10).collect();
        assert_eq!(Paging::new(2, 1).apply(rows.clone()), vec![2, 3]);
        assert_eq!(Paging::new(0, 8).apply(rows.clone()), vec![9, 10]);
        assert!(Paging::new(3, 20).apply(rows).is_empty());
    }
}
