//! CRUD wiring: the mutation pipeline, identity stamping and a durable
//! writer attached to a repository through its hooks

use std::sync::Arc;

use serde_json::Value;

use flatstore_core::model::{Identity, FIELD_CREATED_AT, FIELD_OWNER, FIELD_UPDATED_AT};
use flatstore_core::pipeline::{generators::now_timestamp, pre_read, pre_save};
use flatstore_core::repository::{with_id, HookContext};
use flatstore_core::{DurableWriter, EntitySchema, Record, Repository, RepositoryHooks, Store};
use flatstore_core::{Result, WriteAction};

/// Hooks of a repository that persists through `W`
///
/// - create: fresh id, `_created_at` left to its generator, write pipeline,
///   `_owner` stamped from the identity
/// - read: read pipeline
/// - update: `_updated_at` refreshed, write pipeline
/// - write: validate, then persist; delete removes
pub struct CrudHooks<W: DurableWriter> {
    schema: Arc<EntitySchema>,
    identity: Option<Identity>,
    writer: W,
}

impl<W: DurableWriter> CrudHooks<W> {
    pub fn new(schema: Arc<EntitySchema>, writer: W) -> Self {
        Self {
            schema,
            identity: None,
            writer,
        }
    }

    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }
}

impl<W: DurableWriter> RepositoryHooks for CrudHooks<W> {
    fn pre_create(&self, record: Record, ctx: &HookContext<'_>) -> Result<Record> {
        let mut record = with_id(record, true);
        record.remove(FIELD_CREATED_AT);
        let mut record = pre_save(&self.schema, record, ctx.storage)?;
        if let Some(identity) = self.identity.as_ref().filter(|i| !i.id.is_empty()) {
            record.set(FIELD_OWNER, Value::String(identity.id.clone()));
        }
        Ok(record)
    }

    fn pre_read(&self, record: Record, _ctx: &HookContext<'_>) -> Result<Record> {
        Ok(pre_read(&self.schema, record))
    }

    fn pre_update(&self, mut record: Record, ctx: &HookContext<'_>) -> Result<Record> {
        record.set(FIELD_UPDATED_AT, Value::String(now_timestamp()));
        pre_save(&self.schema, record, ctx.storage)
    }

    fn write(&self, record: &Record, action: WriteAction, ctx: &HookContext<'_>) -> Result<()> {
        if action != WriteAction::Delete {
            self.schema.validate(record.clone())?;
        }
        self.writer.write(ctx.entity, record, action)
    }
}

/// Repository over one entity of `store`, persisting through `writer`
///
/// # Errors
///
/// Returns `EntityNotFound` if the entity is not configured.
pub fn factory_repository<'s, W: DurableWriter>(
    store: &'s mut Store,
    entity: &str,
    writer: W,
    identity: Option<Identity>,
) -> Result<Repository<'s, CrudHooks<W>>> {
    let schema = Arc::clone(store.schema(entity)?);
    let storage = store.collection_mut(entity)?;
    let hooks = CrudHooks::new(schema, writer).with_identity(identity);
    Ok(Repository::new(entity, storage, hooks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use flatstore_core::model::{AccessMatrix, Collection, EntityDefinition, EntityMeta};
    use flatstore_core::FlatstoreError;
    use serde_json::json;

    #[derive(Default)]
    struct MemWriter {
        log: RefCell<Vec<(String, String, WriteAction)>>,
    }

    impl DurableWriter for MemWriter {
        fn write(&self, entity: &str, record: &Record, action: WriteAction) -> Result<()> {
            self.log.borrow_mut().push((
                entity.to_string(),
                record.id().unwrap_or_default().to_string(),
                action,
            ));
            Ok(())
        }
    }

    fn store() -> Store {
        let schema = EntitySchema::compile(
            "note",
            json!({
                "$id": "#/note",
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "title": { "type": "string", "_transform": "trim", "_unique": true },
                    "_created_at": { "type": "string", "_default": "now" },
                    "_updated_at": { "type": "string" },
                    "_owner": { "type": "string" }
                },
                "required": ["id", "title"]
            }),
        )
        .unwrap();
        let mut s = Store::new();
        s.insert_entity(
            EntityDefinition {
                name: "note".into(),
                schema: Arc::new(schema),
                access: AccessMatrix::default(),
                meta: EntityMeta::default(),
            },
            Collection::new(),
        );
        s
    }

    #[test]
    fn test_create_stamps_id_owner_and_timestamp() {
        let mut s = store();
        let writer = MemWriter::default();
        let who = Identity::new("user-1", "editor");
        let mut repo = factory_repository(&mut s, "note", &writer, Some(who)).unwrap();

        let created = repo
            .insert(Record::from_value(json!({
                "id": "client-chosen",
                "title": " Hello ",
                "_created_at": "1999-01-01T00:00:00.000Z"
            })).unwrap())
            .unwrap();

        assert_ne!(created.id(), Some("client-chosen"));
        assert_eq!(created.owner(), Some("user-1"));
        assert_eq!(created.get("title"), Some(&json!("Hello")));
        assert_ne!(created.created_at(), Some(&json!("1999-01-01T00:00:00.000Z")));

        let log = writer.log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "note");
        assert_eq!(log[0].2, WriteAction::Create);
    }

    #[test]
    fn test_update_sets_updated_at_and_checks_uniqueness() {
        let mut s = store();
        let writer = MemWriter::default();
        let mut repo = factory_repository(&mut s, "note", &writer, None).unwrap();

        let a = repo
            .insert(Record::from_value(json!({ "title": "a" })).unwrap())
            .unwrap();
        let b = repo
            .insert(Record::from_value(json!({ "title": "b" })).unwrap())
            .unwrap();
        assert!(a.owner().is_none());

        let updated = repo
            .update(Record::from_value(json!({ "id": a.id().unwrap(), "title": "a2" })).unwrap())
            .unwrap();
        assert!(updated.updated_at().is_some());

        let err = repo
            .update(Record::from_value(json!({ "id": b.id().unwrap(), "title": "a2" })).unwrap())
            .unwrap_err();
        assert!(matches!(err, FlatstoreError::UniqueViolation { .. }));
    }

    #[test]
    fn test_invalid_record_is_never_written() {
        let mut s = store();
        let writer = MemWriter::default();
        let mut repo = factory_repository(&mut s, "note", &writer, None).unwrap();

        let err = repo
            .insert(Record::from_value(json!({ "title": 5 })).unwrap())
            .unwrap_err();
        assert!(matches!(err, FlatstoreError::ValidationFailed { .. }));
        assert!(writer.log.borrow().is_empty());
        assert_eq!(s.collection("note").unwrap().len(), 0);
    }

    #[test]
    fn test_delete_reaches_writer() {
        let mut s = store();
        let writer = MemWriter::default();
        let mut repo = factory_repository(&mut s, "note", &writer, None).unwrap();
        let a = repo
            .insert(Record::from_value(json!({ "title": "a" })).unwrap())
            .unwrap();
        repo.delete(a.id().unwrap()).unwrap();
        assert_eq!(writer.log.borrow().last().unwrap().2, WriteAction::Delete);
    }

    #[test]
    fn test_unknown_entity() {
        let mut s = store();
        assert!(factory_repository(&mut s, "nope", MemWriter::default(), None).is_err());
    }
}
