//! Store loader
//!
//! Two phases with a hard boundary between them:
//! - [`load`] walks the data directories and collects raw configuration and
//!   candidate records, touching nothing but the filesystem
//! - [`build`] turns that raw data into a fresh [`Store`]: effective schemas,
//!   access and meta per entity, and the records that pass validation
//!
//! Layout of a data directory:
//! ```text
//! __defaults.yaml        optional override of the master defaults
//! page.yaml              configuration of entity "page"
//! page/<id>.json         one record of "page"; the file name is its id
//! ```

pub mod merge;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use flatstore_core::errors::{ExError, FlatstoreError};
use flatstore_core::model::{Collection, EntityDefinition};
use flatstore_core::pipeline::pre_read;
use flatstore_core::uid::is_model_uid_like;
use flatstore_core::{log_op_end, log_op_error, log_op_start};
use flatstore_core::{AccessMatrix, EntityMeta, EntitySchema, Record, Store};

use crate::errors::{config_error, io_error, parse_error, Result};
pub use merge::{deep_merge, merged};

/// Project-level override of the master defaults
pub const DEFAULTS_FILE: &str = "__defaults.yaml";

pub const KEY_ACCESS: &str = "_access";
pub const KEY_SCHEMA: &str = "_schema";
pub const KEY_PROPERTY_TEMPLATE: &str = "_schema_property_template";
pub const KEY_META: &str = "_meta";

const DEFAULTS_TEMPLATE: &str = include_str!("defaults_template.yaml");

/// Everything read from disk, before any validation
#[derive(Debug, Clone, Default)]
pub struct RawData {
    /// Master defaults with every `__defaults.yaml` merged in
    pub defaults: Value,
    /// Entity name to its configuration file content
    pub configs: BTreeMap<String, Value>,
    /// Entity name to id to parsed record file
    pub records: BTreeMap<String, BTreeMap<String, Value>>,
}

/// The built-in master defaults
pub fn master_defaults() -> Result<Value> {
    parse_yaml(Path::new("defaults_template.yaml"), DEFAULTS_TEMPLATE)
}

fn parse_yaml(path: &Path, text: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| parse_error(path, e))?;
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        obj @ Value::Object(_) => Ok(obj),
        other => Err(parse_error(
            path,
            format!("expected a mapping, found {}", other),
        )),
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| io_error("read_file", e))
}

/// Collect raw data from `dirs` over the built-in master defaults
///
/// # Errors
///
/// Unreadable directories, unparsable configuration files and non-lowercase
/// entity directories are fatal. Unparsable record files are skipped.
pub fn load<P: AsRef<Path>>(dirs: &[P]) -> Result<RawData> {
    load_with_defaults(dirs, master_defaults()?)
}

/// Collect raw data from `dirs` over the given master defaults
///
/// # Errors
///
/// See [`load`].
pub fn load_with_defaults<P: AsRef<Path>>(dirs: &[P], defaults: Value) -> Result<RawData> {
    let start = Instant::now();
    log_op_start!("load", dir_count = dirs.len());

    let result = load_inner(dirs, defaults);
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(raw) => log_op_end!(
            "load",
            duration_ms = duration_ms,
            entity_count = raw.configs.len(),
            record_count = raw.records.values().map(BTreeMap::len).sum::<usize>()
        ),
        Err(e) => log_op_error!("load", e, duration_ms = duration_ms),
    }
    result
}

fn load_inner<P: AsRef<Path>>(dirs: &[P], defaults: Value) -> Result<RawData> {
    let mut raw = RawData {
        defaults,
        ..RawData::default()
    };

    let mut seen: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref().to_path_buf();
        if seen.contains(&dir) {
            continue;
        }
        seen.push(dir.clone());

        let mut files = Vec::new();
        walk(&dir, &dir, &mut files)?;
        for (relpath, abs) in files {
            collect_file(&mut raw, &relpath, &abs)?;
        }
    }
    Ok(raw)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn collect_file(raw: &mut RawData, relpath: &str, abs: &Path) -> Result<()> {
    let depth = relpath.matches('/').count();

    if has_extension(abs, "yaml") {
        if relpath == DEFAULTS_FILE {
            let overlay = parse_yaml(abs, &read_to_string(abs)?)?;
            deep_merge(&mut raw.defaults, overlay);
        } else if depth == 0 {
            let config = parse_yaml(abs, &read_to_string(abs)?)?;
            raw.configs.insert(file_stem(abs), config);
        }
        return Ok(());
    }

    if has_extension(abs, "json") && depth == 1 {
        let entity = relpath.split('/').next().unwrap_or_default().to_string();
        if entity != entity.to_lowercase() {
            return Err(ExError::from(FlatstoreError::InvalidEntityName { entity }));
        }
        let id = file_stem(abs);
        let parsed = read_to_string(abs).and_then(|text| {
            serde_json::from_str::<Value>(&text).map_err(|e| parse_error(abs, e))
        });
        match parsed {
            Ok(value) => {
                raw.records.entry(entity).or_default().insert(id, value);
            }
            Err(e) => warn!(
                entity = entity.as_str(),
                record_id = id.as_str(),
                error = %e,
                "skipped unreadable record file"
            ),
        }
        return Ok(());
    }

    debug!(path = relpath, "ignored file");
    Ok(())
}

/// Every regular file under `dir`, as (`/`-separated path relative to
/// `root`, absolute path), in name order
fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_error("read_dir", e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| io_error("read_dir", e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error("read_dir", e))?;
        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if path.is_file() {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, path));
        }
    }
    Ok(())
}

fn section<'a>(config: &'a Value, key: &str) -> &'a Value {
    static EMPTY: Value = Value::Null;
    config.get(key).unwrap_or(&EMPTY)
}

fn merge_section(defaults: &Value, config: &Value, key: &str) -> Value {
    let base = match section(defaults, key) {
        Value::Null => json!({}),
        v => v.clone(),
    };
    match section(config, key) {
        Value::Null => base,
        overlay => merged(&base, overlay),
    }
}

/// Effective schema document of `entity`
///
/// Master `_schema` merged with the entity's, `$id` set to `#/<entity>`,
/// `id` always required, and the property template merged under every
/// declared property.
///
/// # Errors
///
/// Returns a configuration error when the merged schema or its
/// `properties` is not a mapping.
pub fn effective_schema(entity: &str, defaults: &Value, config: &Value) -> Result<Value> {
    let mut schema = merge_section(defaults, config, KEY_SCHEMA);
    let template = section(defaults, KEY_PROPERTY_TEMPLATE).clone();

    let Value::Object(obj) = &mut schema else {
        return Err(config_error(
            "effective_schema",
            format!("{}.{} must be a mapping", entity, KEY_SCHEMA),
        ));
    };
    obj.insert("$id".to_string(), Value::String(format!("#/{}", entity)));

    let mut required = vec![Value::String("id".to_string())];
    if let Some(Value::Array(existing)) = obj.get("required") {
        for r in existing {
            if !required.contains(r) {
                required.push(r.clone());
            }
        }
    }
    obj.insert("required".to_string(), Value::Array(required));

    let properties = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(props) = properties else {
        return Err(config_error(
            "effective_schema",
            format!("{}.{}.properties must be a mapping", entity, KEY_SCHEMA),
        ));
    };
    if template.is_object() {
        for prop in props.values_mut() {
            *prop = merged(&template, prop);
        }
    }
    Ok(schema)
}

fn parse_section<T: serde::de::DeserializeOwned>(
    entity: &str,
    key: &str,
    value: Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        config_error(
            "build_store",
            format!("invalid {}.{}: {}", entity, key, e),
        )
    })
}

/// Build a fresh store from raw data
///
/// # Errors
///
/// Any configuration problem (bad schema, unknown generator or transform,
/// malformed access or meta) aborts the build; no partial store is
/// returned. Invalid records are dropped with a warning.
pub fn build(raw: RawData) -> Result<Store> {
    let start = Instant::now();
    log_op_start!("build_store");

    let result = build_inner(raw);
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(store) => log_op_end!(
            "build_store",
            duration_ms = duration_ms,
            entity_count = store.entities().count(),
            record_count = store.record_count()
        ),
        Err(e) => log_op_error!("build_store", e, duration_ms = duration_ms),
    }
    result
}

fn build_inner(raw: RawData) -> Result<Store> {
    let RawData {
        defaults,
        configs,
        mut records,
    } = raw;
    let mut store = Store::new();

    for (entity, config) in configs {
        if section(&config, KEY_SCHEMA).is_null() {
            debug!(entity = entity.as_str(), "empty schema config, using plain default");
        }
        let document = effective_schema(&entity, &defaults, &config)?;
        let schema = Arc::new(EntitySchema::compile(entity.as_str(), document)?);
        let access: AccessMatrix = parse_section(
            &entity,
            KEY_ACCESS,
            merge_section(&defaults, &config, KEY_ACCESS),
        )?;
        let meta: EntityMeta =
            parse_section(&entity, KEY_META, merge_section(&defaults, &config, KEY_META))?;

        let candidates = records.remove(&entity).unwrap_or_default();
        let admitted = admit(&schema, candidates);

        store.insert_entity(
            EntityDefinition {
                name: entity,
                schema,
                access,
                meta,
            },
            admitted,
        );
    }

    for (entity, orphans) in &records {
        debug!(
            entity = entity.as_str(),
            record_count = orphans.len(),
            "orphan records without entity configuration"
        );
    }

    Ok(store)
}

/// Candidates that pass the read pipeline and validation, keyed by file id
fn admit(schema: &EntitySchema, candidates: BTreeMap<String, Value>) -> Collection {
    let mut admitted = Collection::new();
    for (id, value) in candidates {
        let mut record = match Record::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    entity = schema.name(),
                    record_id = id.as_str(),
                    error = %e,
                    "dropped invalid record"
                );
                continue;
            }
        };
        record.set_id(id.as_str());
        let record = pre_read(schema, record);
        match schema.validate(record) {
            Ok(r) => {
                if !is_model_uid_like(&id) {
                    warn!(
                        entity = schema.name(),
                        record_id = id.as_str(),
                        "record id is not reference-shaped, inclusion cannot reach it"
                    );
                }
                admitted.insert(id, r);
            }
            Err(e) => warn!(
                entity = schema.name(),
                record_id = id.as_str(),
                error = %e,
                "dropped invalid record"
            ),
        }
    }
    admitted
}

/// [`load`] then [`build`]
///
/// # Errors
///
/// See [`load`] and [`build`].
pub fn load_store<P: AsRef<Path>>(dirs: &[P]) -> Result<Store> {
    build(load(dirs)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_defaults_parse() {
        let d = master_defaults().unwrap();
        assert!(d[KEY_SCHEMA]["properties"]["id"].is_object());
        assert_eq!(d[KEY_ACCESS]["public"]["read_all"], json!(false));
    }

    #[test]
    fn test_effective_schema() {
        let defaults = master_defaults().unwrap();
        let config = json!({
            "_schema": {
                "required": ["title", "id"],
                "properties": { "title": { "type": "string" } }
            }
        });
        let s = effective_schema("page", &defaults, &config).unwrap();
        assert_eq!(s["$id"], json!("#/page"));
        assert_eq!(s["required"], json!(["id", "title"]));
        // template merged under declared properties
        assert_eq!(s["properties"]["title"]["_html"], json!({}));
        assert_eq!(s["properties"]["title"]["type"], json!("string"));
        // master properties kept
        assert!(s["properties"]["_created_at"].is_object());
    }

    #[test]
    fn test_effective_schema_rejects_non_mapping() {
        let defaults = json!({});
        let config = json!({ "_schema": { "properties": [1] } });
        assert!(effective_schema("page", &defaults, &config).is_err());
    }

    #[test]
    fn test_build_drops_invalid_records() {
        let mut raw = RawData {
            defaults: master_defaults().unwrap(),
            ..RawData::default()
        };
        raw.configs.insert(
            "page".into(),
            json!({ "_schema": { "properties": { "n": { "type": "integer" } } } }),
        );
        let mut pages = BTreeMap::new();
        pages.insert("good".to_string(), json!({ "id": "ignored", "n": 1, "junk": 2 }));
        pages.insert("bad".to_string(), json!({ "n": "x" }));
        pages.insert("scalar".to_string(), json!(3));
        raw.records.insert("page".into(), pages);

        let store = build(raw).unwrap();
        let coll = store.collection("page").unwrap();
        assert_eq!(coll.keys().collect::<Vec<_>>(), vec!["good"]);
        let good = &coll["good"];
        assert_eq!(good.id(), Some("good"));
        assert!(!good.contains_key("junk"));
        assert!(good.created_at().is_some());
    }
}
