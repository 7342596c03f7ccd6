//! Default-value generators (`_default: { fn: <name> }`)

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    /// Time-prefixed record id; also accepted as `id`
    ModelId,
    Uuid,
    /// Short random id
    Uid,
    /// Current timestamp, RFC 3339 with milliseconds
    Now,
    /// Current date, `YYYY-MM-DD`
    Today,
}

impl Generator {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "modelid" | "id" => Generator::ModelId,
            "uuid" => Generator::Uuid,
            "uid" => Generator::Uid,
            "now" => Generator::Now,
            "today" => Generator::Today,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Generator::ModelId => "modelid",
            Generator::Uuid => "uuid",
            Generator::Uid => "uid",
            Generator::Now => "now",
            Generator::Today => "today",
        }
    }

    pub fn generate(&self) -> Value {
        Value::String(match self {
            Generator::ModelId => uid::model_uid(),
            Generator::Uuid => uid::uuid(),
            Generator::Uid => uid::short_uid(),
            Generator::Now => now_timestamp(),
            Generator::Today => today(),
        })
    }
}

/// `2024-05-01T10:20:30.123Z`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(Generator::parse("id"), Some(Generator::ModelId));
        assert_eq!(Generator::parse("modelid"), Some(Generator::ModelId));
        assert_eq!(Generator::parse("today"), Some(Generator::Today));
        assert_eq!(Generator::parse("tomorrow"), None);
    }

    #[test]
    fn test_now_shape() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-05-01T10:20:30.123Z".len());
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_generated_values_are_strings() {
        for g in [
            Generator::ModelId,
            Generator::Uuid,
            Generator::Uid,
            Generator::Now,
            Generator::Today,
        ] {
            assert!(g.generate().is_string(), "{}", g.name());
        }
        assert_eq!(today().len(), 10);
    }
}
