//! RegDiff CLI
//!
//! Command-line interface for comparing register payloads and browsing
//! change history

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "regdiff")]
#[command(about = "RegDiff - Register payload diff and change history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Diff two payload files (JSON or YAML)
    Diff(commands::diff::DiffArgs),
    /// List the change requests touching an item in a store file
    History(commands::history::HistoryArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::History(args) => commands::history::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
