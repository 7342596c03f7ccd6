//! External schema export

use clap::Args;

use super::{print_json, CommandResult, DataArgs};

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Keep hidden (`__`) properties
    #[arg(long)]
    pub include_internal: bool,
}

pub fn execute(args: SchemaArgs) -> CommandResult {
    let store = args.data.load()?;
    print_json(&store.external_schema(!args.include_internal)?)
}
