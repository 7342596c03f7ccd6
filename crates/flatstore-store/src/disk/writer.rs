use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flatstore_core::errors::{ExError, FlatstoreError};
use flatstore_core::{DurableWriter, EntityMeta, Record, WriteAction};

use super::atomic::{atomic_write, remove_file};

/// Durable writer keeping one pretty-printed JSON file per record
///
/// Records live at `<data_dir>/<dir>/<id>.json`, where `<dir>` is the
/// entity's `write_target` or, by default, the entity name. This is the
/// same layout the loader reads back.
#[derive(Debug, Clone)]
pub struct FsWriter {
    data_dir: PathBuf,
    targets: BTreeMap<String, String>,
}

impl FsWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            targets: BTreeMap::new(),
        }
    }

    /// Honour `write_target` overrides from entity metadata
    pub fn with_targets<'a, I>(mut self, metas: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a EntityMeta)>,
    {
        for (entity, meta) in metas {
            if let Some(target) = meta.write_target.as_deref().filter(|t| !t.is_empty()) {
                self.targets.insert(entity.to_string(), target.to_string());
            }
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn entity_dir(&self, entity: &str) -> PathBuf {
        let dir = self.targets.get(entity).map(String::as_str).unwrap_or(entity);
        self.data_dir.join(dir)
    }

    pub fn record_path(&self, entity: &str, id: &str) -> PathBuf {
        self.entity_dir(entity).join(format!("{}.json", id))
    }

    fn persistence(op: &str, err: impl std::fmt::Display) -> FlatstoreError {
        FlatstoreError::Persistence {
            op: op.to_string(),
            message: err.to_string(),
        }
    }
}

impl DurableWriter for FsWriter {
    fn write(
        &self,
        entity: &str,
        record: &Record,
        action: WriteAction,
    ) -> flatstore_core::Result<()> {
        let id = record.id().ok_or_else(|| FlatstoreError::MissingId {
            entity: entity.to_string(),
        })?;
        // ids become file names
        if id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(Self::persistence(
                action.as_str(),
                format!("id '{}' is not usable as a file name", id),
            ));
        }
        let path = self.record_path(entity, id);

        let result: Result<(), ExError> = match action {
            WriteAction::Delete => remove_file(&path),
            WriteAction::Create | WriteAction::Update => {
                let body = serde_json::to_vec_pretty(record)?;
                atomic_write(&path, &body)
            }
        };
        result.map_err(|e| Self::persistence(action.as_str(), e))?;

        tracing::debug!(
            entity = entity,
            record_id = id,
            action = action.as_str(),
            path = %path.display(),
            "record file written"
        );
        Ok(())
    }
}
