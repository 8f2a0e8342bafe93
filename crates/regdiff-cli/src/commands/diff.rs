//! Diff command
//!
//! Usage: regdiff diff <A> <B> [--hide-empty] [--hide-unchanged] [--format markdown|json]

use crate::commands::input::{emit, load_config, read_document};
use clap::{Args, ValueEnum};
use regdiff_core::diff::{compute_diff, entries, render_human_summary};
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Left-hand payload file (JSON, or YAML by extension)
    pub a: PathBuf,

    /// Right-hand payload file
    pub b: PathBuf,

    /// Prune null, empty-string and all-empty members before diffing
    #[arg(long)]
    pub hide_empty: bool,

    /// Only list entries that differ
    #[arg(long)]
    pub hide_unchanged: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute diff command
pub fn execute(args: DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;

    let mut options = config.normalize_options();
    options.hide_empty |= args.hide_empty;
    let show_unchanged = config.diff.show_unchanged && !args.hide_unchanged;

    let a = read_document(&args.a)?;
    let b = read_document(&args.b)?;
    let tree = compute_diff(Some(&a), Some(&b), &options)?;

    let text = match args.format {
        OutputFormat::Markdown => render_human_summary(&tree, show_unchanged),
        OutputFormat::Json => {
            let doc = json!({
                "status": tree.status,
                "summary": tree.summary,
                "entries": entries(&tree, show_unchanged),
            });
            let mut text = serde_json::to_string_pretty(&doc)?;
            text.push('\n');
            text
        }
    };

    emit(&text, args.output.as_deref())
}
