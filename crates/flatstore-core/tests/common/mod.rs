use std::sync::Arc;

use flatstore_core::model::{Collection, Models};
use flatstore_core::pipeline::{pre_read, pre_save};
use flatstore_core::repository::{with_id, HookContext};
use flatstore_core::{EntitySchema, Record, RepositoryHooks, Result, WriteAction};
use serde_json::{json, Value};

#[allow(dead_code)]
pub fn rec(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

#[allow(dead_code)]
pub fn collection(rows: Vec<Value>) -> Collection {
    rows.into_iter()
        .map(|v| {
            let r = rec(v);
            (r.id().unwrap().to_string(), r)
        })
        .collect()
}

/// `user` entity: trimmed, lower-cased unique name, hashed password,
/// generated creation timestamp and one hidden field
#[allow(dead_code)]
pub fn user_schema() -> Arc<EntitySchema> {
    Arc::new(
        EntitySchema::compile(
            "user",
            json!({
                "$id": "#/user",
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "name": { "type": "string", "_transform": ["trim", "lowercase"], "_unique": true },
                    "password": { "type": "string", "_transform": "hash" },
                    "age": { "type": ["integer", "null"], "_transform": "int" },
                    "_created_at": { "type": "string", "_default": "now" },
                    "_updated_at": { "type": "string" },
                    "__note": { "type": "string" }
                },
                "required": ["id", "name"],
                "additionalProperties": false
            }),
        )
        .unwrap(),
    )
}

/// Hooks that run the mutation pipeline and validate before "writing"
#[allow(dead_code)]
pub struct PipelineHooks {
    pub schema: Arc<EntitySchema>,
}

impl RepositoryHooks for PipelineHooks {
    fn pre_create(&self, record: Record, ctx: &HookContext<'_>) -> Result<Record> {
        pre_save(&self.schema, with_id(record, false), ctx.storage)
    }

    fn pre_read(&self, record: Record, _ctx: &HookContext<'_>) -> Result<Record> {
        Ok(pre_read(&self.schema, record))
    }

    fn pre_update(&self, record: Record, ctx: &HookContext<'_>) -> Result<Record> {
        pre_save(&self.schema, record, ctx.storage)
    }

    fn write(&self, record: &Record, action: WriteAction, _ctx: &HookContext<'_>) -> Result<()> {
        if action != WriteAction::Delete {
            self.schema.validate(record.clone())?;
        }
        Ok(())
    }
}

pub const NODE_A: &str = "aaaa-0000-0000-0001";
pub const NODE_B: &str = "aaaa-0000-0000-0002";
pub const NODE_C: &str = "aaaa-0000-0000-0003";

/// `entity/id` reference string
#[allow(dead_code)]
pub fn node_ref(id: &str) -> String {
    format!("node/{}", id)
}

/// `node` records linked by `next` references: A -> B -> C
#[allow(dead_code)]
pub fn chain_models() -> Models {
    let mut models = Models::new();
    models.insert(
        "node".into(),
        collection(vec![
            json!({ "id": NODE_A, "next": node_ref(NODE_B) }),
            json!({ "id": NODE_B, "next": node_ref(NODE_C) }),
            json!({ "id": NODE_C }),
        ]),
    );
    models
}

/// Id of the `i`-th ranked item, e.g. `item-0000-0000-0003`
#[allow(dead_code)]
pub fn item_id(i: usize) -> String {
    format!("item-0000-0000-{:04}", i)
}

/// `item` records with a `rank` and a `name`, ids from [`item_id`]
#[allow(dead_code)]
pub fn ranked_models(n: usize) -> Models {
    let rows = (0..n)
        .map(|i| json!({ "id": item_id(i), "rank": i, "name": format!("n{:02}", i) }))
        .collect();
    let mut models = Models::new();
    models.insert("item".into(), collection(rows));
    models
}
