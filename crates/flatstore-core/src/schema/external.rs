//! Combined external schema document
//!
//! Every entity schema lands under `definitions/<name>`; local references of
//! the form `#/<name>` are rewritten to `#/definitions/<name>` so the
//! combined document resolves on its own.

use serde_json::{json, Map, Value};

use crate::errors::{FlatstoreError, Result};
use crate::model::is_hidden_field;

use super::EntitySchema;

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";
const DEFINITIONS: &str = "definitions";

/// Merge schemas into one draft-07 document
///
/// With `hide_internal`, every object key starting with a double underscore
/// is removed at any depth and hidden names are dropped from `required`.
///
/// # Errors
///
/// Returns `InvalidSchema` for a schema without a string `$id`.
pub fn build_external_schema<'a, I>(schemas: I, hide_internal: bool, title: &str) -> Result<Value>
where
    I: IntoIterator<Item = &'a EntitySchema>,
{
    let mut definitions = Map::new();
    for schema in schemas {
        let id = schema
            .schema_id()
            .ok_or_else(|| FlatstoreError::InvalidSchema {
                entity: schema.name().to_string(),
                reason: "schema has no $id".to_string(),
            })?;
        let name = id.trim_start_matches("#/").to_string();

        let mut doc = rewrite_refs(schema.document().clone());
        if hide_internal {
            doc = strip_hidden(doc);
        }
        if let Value::Object(obj) = &mut doc {
            obj.insert(
                "$id".to_string(),
                Value::String(format!("#/{}/{}", DEFINITIONS, name)),
            );
            if hide_internal {
                if let Some(Value::Array(required)) = obj.get_mut("required") {
                    required.retain(|r| !r.as_str().map(is_hidden_field).unwrap_or(false));
                }
            }
        }
        definitions.insert(name, doc);
    }

    Ok(json!({
        "$schema": DRAFT_07,
        "title": title,
        "type": "object",
        "definitions": definitions,
    }))
}

fn rewrite_refs(value: Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| {
                    let v = match (k.as_str(), v) {
                        ("$ref", Value::String(r)) => Value::String(rewrite_ref(&r)),
                        (_, other) => rewrite_refs(other),
                    };
                    (k, v)
                })
                .collect(),
        ),
        Value::Array(list) => Value::Array(list.into_iter().map(rewrite_refs).collect()),
        other => other,
    }
}

fn rewrite_ref(r: &str) -> String {
    let prefix = format!("#/{}/", DEFINITIONS);
    if r.starts_with(&prefix) {
        return r.to_string();
    }
    match r.strip_prefix("#/") {
        Some(rest) => format!("{}{}", prefix, rest),
        None => r.to_string(),
    }
}

fn strip_hidden(value: Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .filter(|(k, _)| !is_hidden_field(k))
                .map(|(k, v)| (k, strip_hidden(v)))
                .collect(),
        ),
        Value::Array(list) => Value::Array(list.into_iter().map(strip_hidden).collect()),
        other => other,
    }
}
