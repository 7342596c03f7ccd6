//! Mutation pipeline
//!
//! Four ordered steps shared by the read and write paths:
//! 1. allow-list: drop fields the schema does not declare
//! 2. defaults: fill missing or null properties from their generator
//! 3. transforms: apply each property's transform list in order
//! 4. uniqueness: reject collisions on `_unique` properties
//!
//! The read path runs only the first two, so changing transform rules never
//! rewrites stored values when they are read back.

pub mod generators;
pub mod transforms;

use flatstore_core_types::Sensitive;
use serde_json::Value;

use crate::errors::{FlatstoreError, Result};
use crate::model::{Record, FIELD_ID};
use crate::query::values::{is_empty_value, json_eq, to_js_string};
use crate::repository::Collection;
use crate::schema::EntitySchema;

pub use generators::Generator;
pub use transforms::{hash_secret, slugify, to_bool, verify_secret, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AllowList,
    Defaults,
    Transforms,
    Uniqueness,
}

/// An ordered list of steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    steps: &'static [Step],
}

impl Pipeline {
    pub const READ: Pipeline = Pipeline {
        steps: &[Step::AllowList, Step::Defaults],
    };

    pub const WRITE: Pipeline = Pipeline {
        steps: &[
            Step::AllowList,
            Step::Defaults,
            Step::Transforms,
            Step::Uniqueness,
        ],
    };

    pub fn steps(&self) -> &'static [Step] {
        self.steps
    }

    /// Run every step in order
    ///
    /// `existing` holds the other records of the same entity; only the
    /// uniqueness step reads it.
    ///
    /// # Errors
    ///
    /// Propagates `TransformFailed` and `UniqueViolation`.
    pub fn run(
        &self,
        schema: &EntitySchema,
        mut record: Record,
        existing: &Collection,
    ) -> Result<Record> {
        for step in self.steps {
            record = match step {
                Step::AllowList => omit_unknown(schema, record),
                Step::Defaults => apply_defaults(schema, record),
                Step::Transforms => apply_transforms(schema, record)?,
                Step::Uniqueness => {
                    assert_unique(schema, &record, existing)?;
                    record
                }
            };
        }
        Ok(record)
    }
}

/// Read-side pipeline: allow-list then defaults
pub fn pre_read(schema: &EntitySchema, record: Record) -> Record {
    apply_defaults(schema, omit_unknown(schema, record))
}

/// Write-side pipeline: all four steps
///
/// # Errors
///
/// Propagates `TransformFailed` and `UniqueViolation`.
pub fn pre_save(schema: &EntitySchema, record: Record, existing: &Collection) -> Result<Record> {
    Pipeline::WRITE.run(schema, record, existing)
}

/// Drop every field the schema does not declare
pub fn omit_unknown(schema: &EntitySchema, mut record: Record) -> Record {
    record.retain(|k, _| schema.has_property(k));
    record
}

/// Fill absent or null properties that declare a generator
pub fn apply_defaults(schema: &EntitySchema, mut record: Record) -> Record {
    for (name, meta) in schema.properties() {
        let Some(generator) = meta.default else {
            continue;
        };
        let missing = matches!(record.get(name), None | Some(Value::Null));
        if missing {
            record.set(name.clone(), generator.generate());
        }
    }
    record
}

/// Apply each property's transforms in declaration order
///
/// # Errors
///
/// Returns `TransformFailed` naming the field, the transform and the
/// offending value (redacted for secret properties).
pub fn apply_transforms(schema: &EntitySchema, mut record: Record) -> Result<Record> {
    for (name, meta) in schema.properties() {
        if meta.transforms.is_empty() {
            continue;
        }
        let Some(mut value) = record.remove(name) else {
            continue;
        };
        let secret = meta.transforms.iter().any(Transform::is_secret);
        for t in &meta.transforms {
            let original = value.clone();
            value = t.apply(value).map_err(|reason| {
                let shown = to_js_string(&original);
                FlatstoreError::TransformFailed {
                    field: name.clone(),
                    transform: t.name().to_string(),
                    value: if secret {
                        Sensitive::new(shown).to_string()
                    } else {
                        shown
                    },
                    reason,
                }
            })?;
        }
        record.set(name.clone(), value);
    }
    Ok(record)
}

/// Reject the record if a `_unique` property collides with another record
///
/// `id` is never checked here; records with the same id as `record` are
/// itself and are skipped. Empty values never collide.
///
/// # Errors
///
/// Returns `UniqueViolation` on the first collision.
pub fn assert_unique(schema: &EntitySchema, record: &Record, existing: &Collection) -> Result<()> {
    for (name, meta) in schema.properties() {
        if !meta.unique || name == FIELD_ID {
            continue;
        }
        let Some(value) = record.get(name) else {
            continue;
        };
        if is_empty_value(value) {
            continue;
        }
        let collision = existing
            .values()
            .filter(|other| other.id() != record.id())
            .any(|other| other.get(name).map(|v| json_eq(v, value)).unwrap_or(false));
        if collision {
            return Err(FlatstoreError::UniqueViolation {
                entity: schema.name().to_string(),
                field: name.clone(),
                value: to_js_string(value),
            });
        }
    }
    Ok(())
}
