//! Projects and their shared stores
//!
//! Each project id maps to one store handle. A refresh builds a complete
//! new store before swapping the handle in, so callers never see a half-built
//! store; anyone still holding the previous handle keeps reading the
//! previous snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};

use flatstore_core::errors::{ExError, ExErrorKind};
use flatstore_core::{log_op_end, log_op_error, log_op_start, Store};

use crate::disk::FsWriter;
use crate::errors::{config_error, io_error, parse_error, Result};
use crate::loader::load_store;

/// Ids that would collide with routes of a serving layer
pub const RESERVED_PROJECT_IDS: &[&str] = &["api", "admin"];

/// Shared, lockable store of one project
pub type StoreHandle = Arc<RwLock<Store>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub data_dir: PathBuf,
    #[serde(default)]
    pub hidden: bool,
}

impl ProjectConfig {
    /// Project with normalised id; the name defaults to the id
    pub fn new(id: &str, data_dir: impl Into<PathBuf>) -> Self {
        let id = normalize_project_id(id);
        Self {
            name: id.clone(),
            id,
            data_dir: data_dir.into(),
            hidden: false,
        }
    }

    /// Read a list of projects from a YAML or JSON file
    ///
    /// Ids are normalised, empty names fall back to the id and relative data
    /// directories are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed files, reserved or empty ids and
    /// duplicate ids.
    pub fn list_from_file(path: &Path) -> Result<Vec<ProjectConfig>> {
        let text = std::fs::read_to_string(path).map_err(|e| io_error("read_projects", e))?;
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let mut configs: Vec<ProjectConfig> = if is_json {
            serde_json::from_str(&text).map_err(|e| parse_error(path, e))?
        } else {
            serde_yaml::from_str(&text).map_err(|e| parse_error(path, e))?
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut seen = Vec::new();
        for config in &mut configs {
            config.id = normalize_project_id(&config.id);
            if config.id.is_empty() {
                return Err(config_error("read_projects", "project id must not be empty"));
            }
            if RESERVED_PROJECT_IDS.contains(&config.id.as_str()) {
                return Err(config_error(
                    "read_projects",
                    format!("project id '{}' is reserved", config.id),
                ));
            }
            if seen.contains(&config.id) {
                return Err(config_error(
                    "read_projects",
                    format!("duplicate project id '{}'", config.id),
                ));
            }
            seen.push(config.id.clone());
            if config.name.trim().is_empty() {
                config.name = config.id.clone();
            }
            if config.data_dir.is_relative() {
                config.data_dir = base.join(&config.data_dir);
            }
        }
        Ok(configs)
    }

    /// Writer for this project's data directory
    pub fn writer(&self, store: &Store) -> FsWriter {
        FsWriter::new(&self.data_dir)
            .with_targets(store.entities().filter_map(|e| store.meta(e).map(|m| (e, m))))
    }
}

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9_]+").expect("static regex"))
}

/// Lowercase, runs of anything but `[a-z0-9_]` to one dash, no leading or
/// trailing dashes
pub fn normalize_project_id(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    non_word()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

struct Entry {
    config: ProjectConfig,
    store: StoreHandle,
}

/// Shared store per project id
#[derive(Default)]
pub struct ProjectRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

fn poisoned() -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("project_registry")
        .with_message("registry lock poisoned")
}

fn build_handle(config: &ProjectConfig) -> Result<StoreHandle> {
    let store = load_store(&[&config.data_dir])?;
    Ok(Arc::new(RwLock::new(store)))
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of `config.id`, building the store on first use
    ///
    /// # Errors
    ///
    /// Propagates loader errors of the first build.
    pub fn shared(&self, config: &ProjectConfig) -> Result<StoreHandle> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        if let Some(entry) = entries.get(&config.id) {
            return Ok(Arc::clone(&entry.store));
        }
        let store = build_handle(config)?;
        entries.insert(
            config.id.clone(),
            Entry {
                config: config.clone(),
                store: Arc::clone(&store),
            },
        );
        Ok(store)
    }

    /// Current handle of a known project
    pub fn get(&self, id: &str) -> Option<StoreHandle> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(id).map(|e| Arc::clone(&e.store)))
    }

    pub fn config(&self, id: &str) -> Option<ProjectConfig> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(id).map(|e| e.config.clone()))
    }

    /// Rebuild a project's store from disk and swap the handle
    ///
    /// On failure the previous handle stays in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown project and propagates loader
    /// errors.
    pub fn refresh(&self, id: &str) -> Result<StoreHandle> {
        let start = Instant::now();
        log_op_start!("refresh", project_id = id);

        let result = self.refresh_inner(id);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!("refresh", duration_ms = duration_ms, project_id = id),
            Err(e) => log_op_error!("refresh", e, duration_ms = duration_ms, project_id = id),
        }
        result
    }

    fn refresh_inner(&self, id: &str) -> Result<StoreHandle> {
        let config = self.config(id).ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("refresh")
                .with_message(format!("Project not found ({})", id))
        })?;
        // built without holding the registry lock
        let store = build_handle(&config)?;

        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(
            id.to_string(),
            Entry {
                config,
                store: Arc::clone(&store),
            },
        );
        Ok(store)
    }

    /// Forget every project
    pub fn reset(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_project_id() {
        assert_eq!(normalize_project_id("  My  Project! "), "my-project");
        assert_eq!(normalize_project_id("--a__b--"), "a__b");
        assert_eq!(normalize_project_id("Café 2"), "caf-2");
        assert_eq!(normalize_project_id("***"), "");
    }

    #[test]
    fn test_list_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.yaml");
        std::fs::write(
            &path,
            "- id: Demo Site\n  data_dir: data/demo\n- id: other\n  name: Other\n  data_dir: /srv/other\n",
        )
        .unwrap();

        let list = ProjectConfig::list_from_file(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "demo-site");
        assert_eq!(list[0].name, "demo-site");
        assert_eq!(list[0].data_dir, dir.path().join("data/demo"));
        assert_eq!(list[1].name, "Other");
        assert_eq!(list[1].data_dir, PathBuf::from("/srv/other"));
    }

    #[test]
    fn test_list_rejects_reserved_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.json");

        std::fs::write(&path, r#"[{ "id": "Admin", "data_dir": "x" }]"#).unwrap();
        let err = ProjectConfig::list_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);

        std::fs::write(
            &path,
            r#"[{ "id": "a", "data_dir": "x" }, { "id": "A", "data_dir": "y" }]"#,
        )
        .unwrap();
        assert!(ProjectConfig::list_from_file(&path).is_err());
    }

    #[test]
    fn test_refresh_unknown_project() {
        let registry = ProjectRegistry::new();
        let err = registry.refresh("nope").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
}
