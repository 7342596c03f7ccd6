//! Named value transforms (`_transform: <name> | [<name>, ...]`)
//!
//! A transform maps one JSON value to another or explains why it cannot.
//! Values of a type a transform does not handle pass through unchanged.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    Trim,
    Lowercase,
    Uppercase,
    /// One-way Argon2 hash of a secret
    Hash,
    Slugify,
    DateTime,
    Date,
    Boolean,
    /// Boolean rendered as `"1"` / `"0"`
    BooleanString,
    Int,
    /// Empty string becomes null
    Null,
    ArrayFromCsv,
}

impl Transform {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "none" => Transform::None,
            "trim" => Transform::Trim,
            "lowercase" => Transform::Lowercase,
            "uppercase" => Transform::Uppercase,
            "hash" => Transform::Hash,
            "slugify" => Transform::Slugify,
            "date-time" => Transform::DateTime,
            "date" => Transform::Date,
            "boolean" => Transform::Boolean,
            "boolean-string" => Transform::BooleanString,
            "int" => Transform::Int,
            "null" => Transform::Null,
            "array-from-csv" => Transform::ArrayFromCsv,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::Trim => "trim",
            Transform::Lowercase => "lowercase",
            Transform::Uppercase => "uppercase",
            Transform::Hash => "hash",
            Transform::Slugify => "slugify",
            Transform::DateTime => "date-time",
            Transform::Date => "date",
            Transform::Boolean => "boolean",
            Transform::BooleanString => "boolean-string",
            Transform::Int => "int",
            Transform::Null => "null",
            Transform::ArrayFromCsv => "array-from-csv",
        }
    }

    /// True when the transformed value must never appear in logs or errors
    pub fn is_secret(&self) -> bool {
        matches!(self, Transform::Hash)
    }

    /// Apply the transform
    ///
    /// # Errors
    ///
    /// Returns a human readable reason when the value cannot be converted
    /// (an unparseable date or integer, a hashing failure).
    pub fn apply(&self, value: Value) -> Result<Value, String> {
        match self {
            Transform::None => Ok(value),
            Transform::Trim => Ok(map_str(value, |s| s.trim().to_string())),
            Transform::Lowercase => Ok(map_str(value, |s| s.to_lowercase())),
            Transform::Uppercase => Ok(map_str(value, |s| s.to_uppercase())),
            Transform::Hash => match value {
                Value::String(s) if !s.is_empty() && !is_secret_hash(&s) => {
                    hash_secret(&s).map(Value::String)
                }
                other => Ok(other),
            },
            Transform::Slugify => Ok(map_str(value, |s| slugify(&s))),
            Transform::DateTime => match parse_instant(&value)? {
                Some(t) => Ok(Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))),
                None => Ok(value),
            },
            Transform::Date => match parse_instant(&value)? {
                Some(t) => Ok(Value::String(t.format("%Y-%m-%d").to_string())),
                None => Ok(value),
            },
            Transform::Boolean => Ok(Value::Bool(to_bool(&value))),
            Transform::BooleanString => Ok(Value::String(
                if to_bool(&value) { "1" } else { "0" }.to_string(),
            )),
            Transform::Int => to_int(value),
            Transform::Null => Ok(match value {
                Value::String(s) if s.is_empty() => Value::Null,
                other => other,
            }),
            Transform::ArrayFromCsv => Ok(match value {
                Value::String(s) => Value::Array(
                    s.split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                ),
                Value::Null => Value::Array(Vec::new()),
                other => other,
            }),
        }
    }
}

fn map_str(value: Value, f: impl FnOnce(String) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other,
    }
}

/// Hash a secret into a PHC string (`$argon2id$...`)
///
/// # Errors
///
/// Returns the hasher's message if hashing fails.
pub fn hash_secret(secret: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| e.to_string())
}

/// Check a secret against a stored PHC hash
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Already hashed values are left alone so re-saving a record does not
/// hash the hash.
fn is_secret_hash(s: &str) -> bool {
    s.starts_with("$argon2") && PasswordHash::new(s).is_ok()
}

fn slug_strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[*+~.()'"!:@]"#).expect("static regex"))
}

fn slug_sep_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"))
}

/// `"Hello, World!"` becomes `"hello-world"`
pub fn slugify(s: &str) -> String {
    let stripped = slug_strip_re().replace_all(s, "");
    let lowered = stripped.to_lowercase();
    slug_sep_re()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Interpret a value as a point in time
///
/// Null and empty strings are "no value" (`Ok(None)`). Numbers are epoch
/// milliseconds. Strings may be RFC 3339, a bare date, or a naive date-time
/// taken as UTC.
fn parse_instant(value: &Value) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_date_str(s.trim())
            .map(Some)
            .ok_or_else(|| format!("'{}' is not a recognised date", s)),
        Value::Number(n) => n
            .as_f64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
            .map(Some)
            .ok_or_else(|| format!("{} is not a valid timestamp", n)),
        other => Err(format!("cannot read a date from {}", other)),
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Loose boolean reading used by form input
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "yes" | "y" | "on" | "ok"
        ),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whole part of `f` when it fits an `i64`
fn truncated(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

fn to_int(value: Value) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(b) => Ok(Value::from(i64::from(b))),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
        Value::Number(n) => n
            .as_f64()
            .and_then(truncated)
            .map(Value::from)
            .ok_or_else(|| format!("{} is out of integer range", n)),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => {
            let t = s.trim();
            if let Ok(i) = t.parse::<i64>() {
                return Ok(Value::Number(Number::from(i)));
            }
            t.parse::<f64>()
                .ok()
                .and_then(truncated)
                .map(Value::from)
                .ok_or_else(|| format!("'{}' is not an integer", s))
        }
        other => Err(format!("cannot read an integer from {}", other)),
    }
}
