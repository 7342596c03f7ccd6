//! Where-clause queries

use clap::Args;
use flatstore_core::query::count_where;
use flatstore_core::{output_collection, WhereClause};
use serde_json::{json, Value};

use super::{print_json, CommandResult, DataArgs};

#[derive(Debug, Args)]
pub struct FindArgs {
    #[command(flatten)]
    pub data: DataArgs,

    pub entity: String,

    /// JSON object or list of [key, value] pairs
    #[arg(long = "where")]
    pub where_clause: Option<String>,

    /// e.g. "name", "rank desc" or "random"
    #[arg(long)]
    pub order_by: Option<String>,

    /// 0 means no limit
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

pub fn execute(args: FindArgs) -> CommandResult {
    let store = args.data.load()?;
    // unknown entities are an error here, not an empty result
    store.schema(&args.entity)?;

    let raw: Value = match &args.where_clause {
        Some(text) => serde_json::from_str(text)?,
        None => Value::Null,
    };
    let where_clause = WhereClause::from_value(&raw)?;

    let found = store.find_where(
        &args.entity,
        &where_clause,
        args.order_by.as_deref(),
        args.limit,
        args.offset,
    );
    let total = count_where(store.models(), &args.entity, &where_clause);

    print_json(&json!({
        "total": total,
        "records": output_collection(found),
    }))
}
