//! Where clauses: a conjunction of per-field constraints
//!
//! Each constraint is checked against the record field of the same name,
//! first rule that applies wins:
//! 1. field absent: no match
//! 2. field is a list: match when it shares an element with the constraint
//!    (a scalar constraint is treated as a one-element list)
//! 3. constraint is a list: match when the field is one of its elements
//! 4. constraint is a string `/.../`: case-insensitive regex on the field
//!    rendered as a string
//! 5. otherwise loose equality (`"2"` matches `2`)

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::errors::{FlatstoreError, Result};
use crate::model::Record;

use super::values::{json_eq, loose_eq, to_js_string};

#[derive(Debug, Clone)]
struct Condition {
    key: String,
    value: Value,
    pattern: Option<Regex>,
}

impl Condition {
    fn new(key: String, value: Value) -> Result<Self> {
        let pattern = match value.as_str() {
            Some(s) if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') => Some(
                RegexBuilder::new(&s[1..s.len() - 1])
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| FlatstoreError::InvalidWhere {
                        reason: format!("bad pattern for '{}': {}", key, e),
                    })?,
            ),
            _ => None,
        };
        Ok(Self {
            key,
            value,
            pattern,
        })
    }

    fn matches(&self, record: &Record) -> bool {
        let Some(target) = record.get(&self.key) else {
            return false;
        };

        if let Value::Array(items) = target {
            return match &self.value {
                Value::Array(wanted) => items.iter().any(|i| wanted.iter().any(|w| json_eq(i, w))),
                single => items.iter().any(|i| json_eq(i, single)),
            };
        }
        if let Value::Array(wanted) = &self.value {
            return wanted.iter().any(|w| json_eq(target, w));
        }
        if let Some(re) = &self.pattern {
            if re.is_match(&to_js_string(target)) {
                return true;
            }
        }
        loose_eq(target, &self.value)
    }
}

/// Compiled where clause; an empty clause matches everything
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    conditions: Vec<Condition>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one constraint
    ///
    /// # Errors
    ///
    /// Returns `InvalidWhere` for a `/.../` value that is not a valid regex.
    pub fn and(mut self, key: impl Into<String>, value: Value) -> Result<Self> {
        self.conditions.push(Condition::new(key.into(), value)?);
        Ok(self)
    }

    /// Build from JSON: `null`, an object, or a list of `[key, value]` pairs
    ///
    /// Pair lists come from form input, so their string values `"true"`,
    /// `"false"`, `"null"` and `""` (any case) become `true`, `false`,
    /// `null` and `false`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWhere` for any other shape or a bad pattern.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(obj) => obj
                .iter()
                .try_fold(Self::new(), |w, (k, v)| w.and(k.clone(), v.clone())),
            Value::Array(pairs) => {
                let mut clause = Self::new();
                for pair in pairs {
                    let (key, v) = match pair.as_array().map(Vec::as_slice) {
                        Some([Value::String(k), v]) => (k.clone(), v.clone()),
                        _ => {
                            return Err(FlatstoreError::InvalidWhere {
                                reason: format!("expected a [key, value] pair, got {}", pair),
                            })
                        }
                    };
                    clause = clause.and(key, coerce_form_value(v))?;
                }
                Ok(clause)
            }
            other => Err(FlatstoreError::InvalidWhere {
                reason: format!("expected an object or a list of pairs, got {}", other),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|c| c.key.as_str())
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

fn coerce_form_value(value: Value) -> Value {
    match value {
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" | "" => Value::Bool(false),
            "null" => Value::Null,
            _ => Value::String(s),
        },
        other => other,
    }
}

/// Replace placeholder values in a raw where value
///
/// A constraint value that is a string naming a key of `params` is replaced
/// by that key's value. Works on both the object and the pair-list form.
pub fn substitute_params(where_value: &Value, params: &Map<String, Value>) -> Value {
    let lookup = |v: &Value| -> Value {
        v.as_str()
            .and_then(|s| params.get(s))
            .cloned()
            .unwrap_or_else(|| v.clone())
    };
    match where_value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), lookup(v)))
                .collect(),
        ),
        Value::Array(pairs) => Value::Array(
            pairs
                .iter()
                .map(|pair| match pair.as_array().map(Vec::as_slice) {
                    Some([k, v]) => Value::Array(vec![k.clone(), lookup(v)]),
                    _ => pair.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
