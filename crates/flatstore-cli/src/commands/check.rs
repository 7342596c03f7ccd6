//! Load check

use std::path::PathBuf;

use clap::Args;
use flatstore_store::load_store;
use serde_json::json;

use super::{print_json, CommandResult};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Data directories, later ones win
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,
}

/// Any configuration error fails the command; invalid records only show up
/// as missing from the counts (and as warnings in the log)
pub fn execute(args: CheckArgs) -> CommandResult {
    let store = load_store(&args.dirs)?;
    print_json(&json!({
        "entities": store.summary(),
        "record_count": store.record_count(),
    }))
}
