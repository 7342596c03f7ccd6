//! Flatstore CLI
//!
//! Command-line interface for inspecting and querying flatstore data
//! directories

use clap::{Parser, Subcommand};
use flatstore_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "flatstore")]
#[command(about = "Flatstore - file-backed document store", long_about = None)]
struct Cli {
    /// Human-readable debug logs instead of JSON logs (stderr)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load data directories and report record counts per entity
    Check(commands::check::CheckArgs),
    /// Print the external JSON schema of every entity
    Schema(commands::schema::SchemaArgs),
    /// Query one entity with a where clause
    Find(commands::find::FindArgs),
    /// Resolve the records reachable from a reference
    Include(commands::include::IncludeArgs),
    /// Export every readable entity
    Dump(commands::dump::DumpArgs),
}

fn main() {
    let cli = Cli::parse();
    init(if cli.verbose {
        Profile::Development
    } else {
        Profile::Production
    });

    let result = match cli.command {
        Commands::Check(args) => commands::check::execute(args),
        Commands::Schema(args) => commands::schema::execute(args),
        Commands::Find(args) => commands::find::execute(args),
        Commands::Include(args) => commands::include::execute(args),
        Commands::Dump(args) => commands::dump::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
