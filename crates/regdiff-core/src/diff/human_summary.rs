//! Human-readable summary renderer for payload diffs.

use crate::diff::model::{DiffStatus, DiffTree};
use crate::diff::view::{entries, DiffEntry};
use crate::normalize::NormalizedValue;

/// Longest cell text before it is cut with an ellipsis
const MAX_CELL_CHARS: usize = 60;

/// Render a Markdown summary of a [`DiffTree`].
///
/// Intended for review displays and the CLI. With `show_unchanged = false`
/// the table only lists rows that differ.
pub fn render_human_summary(tree: &DiffTree, show_unchanged: bool) -> String {
    let mut out = String::new();

    out.push_str("## Payload Diff\n\n");

    let status_label = match tree.status {
        DiffStatus::Unchanged => "Unchanged",
        DiffStatus::Added => "Added",
        DiffStatus::Removed => "Removed",
        DiffStatus::Changed => "Changed",
    };
    let s = &tree.summary;
    out.push_str(&format!("**Status**: {status_label}  \n"));
    out.push_str(&format!(
        "**Counts**: {} added, {} removed, {} changed, {} unchanged\n\n",
        s.added, s.removed, s.changed, s.unchanged
    ));

    let rows = entries(tree, show_unchanged);
    if rows.is_empty() {
        if tree.has_changes() {
            out.push_str("_No rows to display._\n");
        } else {
            out.push_str("_No differences._\n");
        }
        return out;
    }

    out.push_str("| Path | Change | Old | New |\n");
    out.push_str("|---|---|---|---|\n");
    for row in &rows {
        out.push_str(&render_row(row));
    }
    out.push('\n');

    out
}

fn render_row(row: &DiffEntry) -> String {
    format!(
        "| `{}` | {} | {} | {} |\n",
        row.path,
        marker(row.status),
        cell(row.old.as_ref()),
        cell(row.new.as_ref()),
    )
}

fn marker(status: DiffStatus) -> &'static str {
    match status {
        DiffStatus::Unchanged => "unchanged",
        DiffStatus::Added => "**added**",
        DiffStatus::Removed => "~~removed~~",
        DiffStatus::Changed => "**changed**",
    }
}

fn cell(value: Option<&NormalizedValue>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let text = value.to_string().replace('|', "\\|");
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(MAX_CELL_CHARS).collect();
    if chars.next().is_some() {
        format!("`{}…`", head)
    } else {
        format!("`{}`", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::engine::compute_diff;
    use crate::normalize::NormalizeOptions;
    use serde_json::json;

    #[test]
    fn test_summary_identical() {
        let v = json!({"name": "metre", "symbol": "m"});
        let tree = compute_diff(Some(&v), Some(&v), &NormalizeOptions::default()).unwrap();
        let s = render_human_summary(&tree, false);
        assert!(s.contains("**Status**: Unchanged"));
        assert!(s.contains("_No differences._"));
        assert!(!s.contains("| Path |"));
    }

    #[test]
    fn test_summary_lists_changed_rows() {
        let tree = compute_diff(
            Some(&json!({"a": 1, "b": {"c": 2}})),
            Some(&json!({"a": 1, "b": {"c": 3, "d": 4}})),
            &NormalizeOptions::default(),
        )
        .unwrap();
        let s = render_human_summary(&tree, false);
        assert!(s.contains("**Counts**: 1 added, 0 removed, 1 changed, 1 unchanged"));
        assert!(s.contains("| `b.c` | **changed** | `2` | `3` |"));
        assert!(s.contains("| `b.d` | **added** |  | `4` |"));
        assert!(!s.contains("| `a` |"));

        let with_unchanged = render_human_summary(&tree, true);
        assert!(with_unchanged.contains("| `a` | unchanged | `1` | `1` |"));
    }

    #[test]
    fn test_long_values_are_cut_and_pipes_escaped() {
        let long = "x".repeat(200);
        let tree = compute_diff(
            Some(&json!({"t": "a|b"})),
            Some(&json!({"t": long})),
            &NormalizeOptions::default(),
        )
        .unwrap();
        let s = render_human_summary(&tree, false);
        assert!(s.contains(r#"`"a\|b"`"#));
        assert!(s.contains("…`"));
    }
}
