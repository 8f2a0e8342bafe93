//! History command
//!
//! Usage: regdiff history <STORE> <ITEM_PATH> [--from N] [--limit N]
//!
//! The store file is a JSON/YAML mapping of object path to object data,
//! scanned in key order.

use crate::commands::diff::OutputFormat;
use crate::commands::input::{emit, load_config, read_document};
use clap::Args;
use regdiff_engine::{HistoryEntry, HistoryResolver, MemoryObjectSource};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Store file: mapping of object path to data
    pub store: PathBuf,

    /// Item path, e.g. /units/metre.yaml
    pub item_path: String,

    /// First history position to show
    #[arg(long, default_value_t = 0)]
    pub from: usize,

    /// Maximum entries to show (default: configured page size)
    #[arg(short, long)]
    pub limit: Option<usize>,

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

/// Execute history command
pub fn execute(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;

    let objects: Vec<(String, Value)> = match read_document(&args.store)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => return Err("store file must be a mapping of object path to data".into()),
    };

    let source = MemoryObjectSource::background(objects, config.history.build_batch_size);
    let resolver = HistoryResolver::new(Arc::new(source), config.history.clone());
    let limit = args.limit.unwrap_or(config.history.page_size);

    let runtime = tokio::runtime::Runtime::new()?;
    let page = runtime.block_on(async {
        let history = resolver.resolve_change_history(&args.item_path).await;
        let mut entries = Vec::new();
        let mut position = args.from;
        loop {
            let page = history.page(position, limit - entries.len()).await;
            position = page.next_position;
            entries.extend(page.entries);
            if page.complete || entries.len() >= limit {
                break (entries, page.status, page.complete);
            }
            tokio::time::sleep(config.history.poll_interval()).await;
        }
    });
    let (entries, status, complete) = page;

    let text = match args.format {
        OutputFormat::Markdown => render_markdown(&args.item_path, &entries, complete),
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "itemPath": args.item_path,
                "status": status,
                "entries": entries,
                "complete": complete,
            });
            let mut text = serde_json::to_string_pretty(&doc)?;
            text.push('\n');
            text
        }
    };

    emit(&text, args.output.as_deref())
}

fn render_markdown(item_path: &str, entries: &[HistoryEntry], complete: bool) -> String {
    let mut out = format!("## Change History: `{}`\n\n", item_path);

    if entries.is_empty() {
        out.push_str("_No change requests._\n");
        return out;
    }

    out.push_str("| # | Change Request | State | Disposition | Justification |\n");
    out.push_str("|---|---|---|---|---|\n");
    for entry in entries {
        match &entry.summary {
            Some(s) => out.push_str(&format!(
                "| {} | `{}` | {:?} | {:?} | {} |\n",
                entry.position,
                s.id,
                s.state,
                s.disposition,
                s.justification_excerpt.replace('|', "\\|"),
            )),
            None => out.push_str(&format!(
                "| {} | `{}` | | | _unavailable_ |\n",
                entry.position,
                entry.path.as_deref().unwrap_or("?")
            )),
        }
    }
    if !complete {
        out.push_str("\n_More entries may follow._\n");
    }
    out
}
