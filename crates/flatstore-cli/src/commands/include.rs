//! Reference inclusion from one root record

use std::collections::BTreeMap;

use clap::Args;
use flatstore_core::query::SelectionResults;
use flatstore_core::{output_record, FlatstoreError, IncludeOptions};
use serde_json::{json, Map, Value};

use super::{parse_key_value, print_json, CommandResult, DataArgs};

#[derive(Debug, Args)]
pub struct IncludeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Root record as entity/id
    pub reference: String,

    /// Deepest depth to include, 0 for unlimited
    #[arg(long, default_value_t = 0)]
    pub depth: usize,

    /// Per-entity depth cap, as name=n
    #[arg(long = "entity-depth", value_parser = parse_key_value)]
    pub entity_depth: Vec<(String, String)>,

    /// Selection placeholder value, as key=value
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

fn options(args: &IncludeArgs) -> Result<IncludeOptions, Box<dyn std::error::Error>> {
    let mut entity_depth = BTreeMap::new();
    for (entity, cap) in &args.entity_depth {
        let cap: usize = cap
            .parse()
            .map_err(|_| format!("invalid depth '{}' for entity '{}'", cap, entity))?;
        entity_depth.insert(entity.clone(), cap);
    }
    let where_params = (!args.params.is_empty()).then(|| {
        args.params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>()
    });
    Ok(IncludeOptions {
        max_depth: args.depth,
        entity_depth,
        where_params,
    })
}

pub fn execute(args: IncludeArgs) -> CommandResult {
    let store = args.data.load()?;
    let options = options(&args)?;

    let (entity, id) = args
        .reference
        .split_once('/')
        .ok_or_else(|| format!("expected entity/id, got '{}'", args.reference))?;
    let root = store
        .collection(entity)?
        .get(id)
        .ok_or_else(|| FlatstoreError::RecordNotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        })?;

    let mut selections = SelectionResults::new();
    let included = store.include(root, Some(&mut selections), &options)?;

    let included: Map<String, Value> = included
        .into_iter()
        .map(|(reference, found)| {
            let entry = json!({
                "entity": found.entity,
                "depth": found.depth,
                "record": output_record(found.record).into_value(),
            });
            (reference, entry)
        })
        .collect();

    print_json(&json!({
        "root": output_record(root).into_value(),
        "included": included,
        "selections": selections,
    }))
}
