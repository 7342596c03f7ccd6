//! Bulk export

use clap::Args;
use flatstore_core::{dump, Audience, DumpFilter};
use serde_json::Value;

use super::{print_json, CommandResult, DataArgs};

#[derive(Debug, Args)]
pub struct DumpArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Comma-separated entities to export; all when absent
    #[arg(long)]
    pub allow: Option<String>,

    /// Comma-separated entities to leave out
    #[arg(long)]
    pub deny: Option<String>,

    /// Export with the rights of a signed-in user instead of the public
    #[arg(long)]
    pub authenticated: bool,
}

pub fn execute(args: DumpArgs) -> CommandResult {
    let store = args.data.load()?;
    let audience = if args.authenticated {
        Audience::Authenticated
    } else {
        Audience::Public
    };
    let filter = DumpFilter::from_lists(args.allow.as_deref(), args.deny.as_deref());
    print_json(&Value::Object(dump(&store, audience, &filter)))
}
