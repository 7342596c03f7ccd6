pub mod check;
pub mod dump;
pub mod find;
pub mod include;
pub mod schema;

use std::path::PathBuf;

use clap::Args;
use flatstore_core::Store;
use flatstore_store::load_store;
use serde_json::Value;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Data directories shared by the query commands
#[derive(Debug, Args)]
pub struct DataArgs {
    /// Data directory; repeat to layer several, later ones win
    #[arg(long = "dir", short = 'd', required = true)]
    pub dirs: Vec<PathBuf>,
}

impl DataArgs {
    pub fn load(&self) -> Result<Store, Box<dyn std::error::Error>> {
        Ok(load_store(&self.dirs)?)
    }
}

pub fn print_json(value: &Value) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Split `key=value`
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}
