use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::{Collection, Record};

/// Marker handed to the durable writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
        }
    }
}

/// What a hook may look at: the entity name and the records as they are
/// before the current operation is applied
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'c> {
    pub entity: &'c str,
    pub storage: &'c Collection,
}

/// Extension points of a [`Repository`](super::Repository)
///
/// Hooks run strictly in order `pre_* -> write -> in-memory change`. An error
/// from any hook aborts the operation before the in-memory collection is
/// touched. Every method defaults to a pass-through.
pub trait RepositoryHooks {
    /// Before a new record is written; may rewrite the record (including
    /// its id)
    fn pre_create(&self, record: Record, _ctx: &HookContext<'_>) -> Result<Record> {
        Ok(record)
    }

    /// Before a stored record is handed to a caller
    fn pre_read(&self, record: Record, _ctx: &HookContext<'_>) -> Result<Record> {
        Ok(record)
    }

    /// Before an updated record (already merged over the stored one) is written
    fn pre_update(&self, record: Record, _ctx: &HookContext<'_>) -> Result<Record> {
        Ok(record)
    }

    fn pre_delete(&self, _record: &Record, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Persist (create/update) or remove (delete) the external copy
    fn write(&self, _record: &Record, _action: WriteAction, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Plain in-memory repository behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl RepositoryHooks for NoHooks {}

/// Storage medium behind the `write` hook
pub trait DurableWriter {
    /// Persist or remove the external representation of `record`
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the medium rejects the change.
    fn write(&self, entity: &str, record: &Record, action: WriteAction) -> Result<()>;
}

/// Writer that keeps nothing; for stores that live only in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWriter;

impl DurableWriter for NullWriter {
    fn write(&self, _entity: &str, _record: &Record, _action: WriteAction) -> Result<()> {
        Ok(())
    }
}

impl<W: DurableWriter + ?Sized> DurableWriter for &W {
    fn write(&self, entity: &str, record: &Record, action: WriteAction) -> Result<()> {
        (**self).write(entity, record, action)
    }
}
