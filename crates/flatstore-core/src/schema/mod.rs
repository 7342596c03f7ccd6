//! Entity schemas
//!
//! An [`EntitySchema`] owns the schema document, the compiled validator and
//! the per-property application metadata (`_default`, `_transform`,
//! `_unique`, `_order`, `_html`). Compilation happens once per instance, so
//! sharing an `Arc<EntitySchema>` shares the compiled validator; building a
//! new instance from an identical document compiles again.

pub mod external;
pub mod validator;

use serde_json::Value;

use crate::errors::{FlatstoreError, Result, ValidationIssue};
use crate::model::Record;
use crate::pipeline::{Generator, Transform};

pub use external::build_external_schema;
pub use validator::{compile, CompileError, Validator};

pub const KEY_DEFAULT: &str = "_default";
pub const KEY_TRANSFORM: &str = "_transform";
pub const KEY_UNIQUE: &str = "_unique";
pub const KEY_ORDER: &str = "_order";
pub const KEY_HTML: &str = "_html";

/// Application metadata of one declared property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMeta {
    pub default: Option<Generator>,
    pub transforms: Vec<Transform>,
    pub unique: bool,
    pub order: Option<f64>,
    /// Opaque rendering hints
    pub html: Option<Value>,
}

impl PropertyMeta {
    fn parse(entity: &str, field: &str, schema: &Value) -> Result<Self> {
        let mut meta = PropertyMeta::default();
        let Some(obj) = schema.as_object() else {
            return Ok(meta);
        };

        meta.default = match obj.get(KEY_DEFAULT) {
            None | Some(Value::Null) => None,
            Some(declared) => {
                let name = declared
                    .as_str()
                    .or_else(|| declared.get("fn").and_then(Value::as_str))
                    .ok_or_else(|| FlatstoreError::InvalidSchema {
                        entity: entity.to_string(),
                        reason: format!("{}.{} must name a generator", field, KEY_DEFAULT),
                    })?;
                Some(
                    Generator::parse(name).ok_or_else(|| FlatstoreError::UnknownGenerator {
                        entity: entity.to_string(),
                        field: field.to_string(),
                        name: name.to_string(),
                    })?,
                )
            }
        };

        let names: Vec<&Value> = match obj.get(KEY_TRANSFORM) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(list)) => list.iter().collect(),
            Some(single) => vec![single],
        };
        for name in names {
            let name = name.as_str().ok_or_else(|| FlatstoreError::InvalidSchema {
                entity: entity.to_string(),
                reason: format!("{}.{} entries must be strings", field, KEY_TRANSFORM),
            })?;
            let t = Transform::parse(name).ok_or_else(|| FlatstoreError::UnknownTransform {
                entity: entity.to_string(),
                field: field.to_string(),
                name: name.to_string(),
            })?;
            meta.transforms.push(t);
        }

        meta.unique = obj.get(KEY_UNIQUE).and_then(Value::as_bool).unwrap_or(false);
        meta.order = obj.get(KEY_ORDER).and_then(Value::as_f64);
        meta.html = obj.get(KEY_HTML).cloned();
        Ok(meta)
    }
}

/// A compiled entity schema
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    document: Value,
    /// Declared properties in document order
    properties: Vec<(String, PropertyMeta)>,
    validator: Validator,
}

impl EntitySchema {
    /// Compile a schema document for `name`
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for malformed keywords, `UnknownGenerator` /
    /// `UnknownTransform` for unsupported property metadata.
    pub fn compile(name: impl Into<String>, document: Value) -> Result<Self> {
        let name = name.into();
        let validator = validator::compile(&document).map_err(|e| FlatstoreError::InvalidSchema {
            entity: name.clone(),
            reason: e.to_string(),
        })?;

        let mut properties = Vec::new();
        if let Some(props) = document.get("properties").and_then(Value::as_object) {
            for (field, sub) in props {
                properties.push((field.clone(), PropertyMeta::parse(&name, field, sub)?));
            }
        }

        Ok(Self {
            name,
            document,
            properties,
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The `$id` of the document, if any
    pub fn schema_id(&self) -> Option<&str> {
        self.document.get("$id").and_then(Value::as_str)
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|(n, _)| n == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, meta)| meta)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&String, &PropertyMeta)> {
        self.properties.iter().map(|(n, m)| (n, m))
    }

    /// Property names sorted by `_order`; unordered properties keep document
    /// order after the ordered ones
    pub fn ordered_property_names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, Option<f64>)> = self
            .properties
            .iter()
            .map(|(n, m)| (n.as_str(), m.order))
            .collect();
        names.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        names.into_iter().map(|(n, _)| n).collect()
    }

    pub fn unique_properties(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(_, m)| m.unique)
            .map(|(n, _)| n.as_str())
    }

    /// All violated rules for `record` (empty when valid)
    pub fn check(&self, record: &Record) -> Vec<ValidationIssue> {
        let value = Value::Object(record.fields().clone());
        self.validator.validate(&value)
    }

    pub fn is_valid(&self, record: &Record) -> bool {
        self.check(record).is_empty()
    }

    /// Validate and hand the record back
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` listing every violated rule.
    pub fn validate(&self, record: Record) -> Result<Record> {
        let issues = self.check(&record);
        if issues.is_empty() {
            Ok(record)
        } else {
            Err(FlatstoreError::ValidationFailed {
                entity: self.name.clone(),
                id: record.id().unwrap_or_default().to_string(),
                issues,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_schema() -> Value {
        json!({
            "$id": "#/page",
            "type": "object",
            "properties": {
                "id": { "type": "string", "_default": { "fn": "modelid" } },
                "title": { "type": "string", "_order": 2, "_transform": "trim" },
                "slug": { "type": "string", "_order": 1, "_transform": ["slugify"], "_unique": true },
                "body": { "type": "string", "_html": { "widget": "editor" } }
            },
            "required": ["id", "title"]
        })
    }

    #[test]
    fn test_compile_reads_property_metadata() {
        let s = EntitySchema::compile("page", page_schema()).unwrap();
        assert_eq!(s.schema_id(), Some("#/page"));
        assert_eq!(s.property("id").unwrap().default, Some(Generator::ModelId));
        assert_eq!(s.property("slug").unwrap().transforms, vec![Transform::Slugify]);
        assert_eq!(s.property("title").unwrap().transforms, vec![Transform::Trim]);
        assert_eq!(s.unique_properties().collect::<Vec<_>>(), vec!["slug"]);
        assert_eq!(
            s.property("body").unwrap().html,
            Some(json!({ "widget": "editor" }))
        );
        assert_eq!(s.ordered_property_names(), vec!["slug", "title", "id", "body"]);
    }

    #[test]
    fn test_unknown_generator_is_configuration_error() {
        let err = EntitySchema::compile(
            "page",
            json!({ "properties": { "when": { "_default": { "fn": "tomorrow" } } } }),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FlatstoreError::UnknownGenerator {
                entity: "page".into(),
                field: "when".into(),
                name: "tomorrow".into()
            }
        );
    }

    #[test]
    fn test_unknown_transform_is_configuration_error() {
        let err = EntitySchema::compile(
            "page",
            json!({ "properties": { "title": { "_transform": ["trim", "rot13"] } } }),
        )
        .unwrap_err();
        assert!(matches!(err, FlatstoreError::UnknownTransform { ref name, .. } if name == "rot13"));
    }

    #[test]
    fn test_validate_returns_record_or_issues() {
        let s = EntitySchema::compile("page", page_schema()).unwrap();
        let ok = Record::from_value(json!({ "id": "A", "title": "t" })).unwrap();
        assert_eq!(s.validate(ok.clone()).unwrap(), ok);

        let bad = Record::from_value(json!({ "id": "A", "title": 3 })).unwrap();
        assert!(!s.is_valid(&bad));
        match s.validate(bad).unwrap_err() {
            FlatstoreError::ValidationFailed { entity, id, issues } => {
                assert_eq!(entity, "page");
                assert_eq!(id, "A");
                assert_eq!(issues[0].instance_path, "/title");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_schema() {
        let err = EntitySchema::compile("page", json!({ "properties": 123 })).unwrap_err();
        assert!(matches!(err, FlatstoreError::InvalidSchema { .. }));
    }

    #[test]
    fn test_each_instance_compiles_independently() {
        let a = EntitySchema::compile("page", page_schema()).unwrap();
        let b = EntitySchema::compile("page", page_schema()).unwrap();
        assert_eq!(a.document(), b.document());
        let r = Record::from_value(json!({ "id": "A", "title": "t" })).unwrap();
        assert_eq!(a.is_valid(&r), b.is_valid(&r));
    }
}
