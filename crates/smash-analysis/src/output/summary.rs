//! Terminal summary of a batch run.

use super::schema::FailedFile;
use crate::aggregator::{DataTree, Value};
use crate::combine::CombinedEntry;
use colored::*;

/// Render a human-readable outline of every combined configuration
///
/// Trees are shown down to `max_depth` levels below each analysis root.
pub fn render_terminal_summary(entries: &[CombinedEntry], failed: &[FailedFile], max_depth: usize) -> String {
    let mut out = String::new();

    out.push_str(&render_header(entries, failed));
    for entry in entries {
        out.push_str(&render_entry(entry, max_depth));
    }
    out.push_str(&render_failures(failed));
    out.push_str(&render_status(entries, failed));

    out
}

fn render_header(entries: &[CombinedEntry], failed: &[FailedFile]) -> String {
    let files: usize = entries.iter().map(|entry| entry.sources.len()).sum();
    let mut out = String::new();
    out.push('\n');
    out.push_str(&"Batch Summary".bold().to_string());
    out.push_str("\n---------------------------------------------------\n");
    out.push_str(&format!("Configurations: {}\n", entries.len()));
    out.push_str(&format!("Files merged:   {}\n", files));
    out.push_str(&format!("Files failed:   {}\n", failed.len()));
    out.push_str("---------------------------------------------------\n");
    out
}

fn render_entry(entry: &CombinedEntry, max_depth: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{} ({} files, {})\n",
        entry.label().cyan().bold(),
        entry.sources.len(),
        entry
            .producer_versions
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    ));
    if entry.issues > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("{} merge conflicts resolved", entry.issues).yellow()
        ));
    }
    out.push_str(&render_outline(&entry.tree, max_depth));
    out
}

/// Indented node listing; leaves show a short description of their value
pub fn render_outline(tree: &DataTree, max_depth: usize) -> String {
    let mut out = String::new();
    for (id, depth) in tree.descendants(tree.root()) {
        if depth > max_depth {
            continue;
        }
        let indent = "  ".repeat(depth);
        match tree.value(id) {
            Some(value) => out.push_str(&format!(
                "{}{}: {}\n",
                indent,
                tree.name(id),
                describe(value).dimmed()
            )),
            None => out.push_str(&format!("{}{}/\n", indent, tree.name(id))),
        }
    }
    out
}

fn describe(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => format!("{:.6}", v),
        Value::IntSeq(v) => format!("[{} ints]", v.len()),
        Value::FloatSeq(v) => format!("[{} floats]", v.len()),
        Value::Histogram(h) => format!(
            "histogram [{}, {}) x {}, {} entries",
            h.lower(),
            h.upper(),
            h.num_bins(),
            h.total()
        ),
    }
}

fn render_failures(failed: &[FailedFile]) -> String {
    let mut out = String::new();
    if !failed.is_empty() {
        out.push_str("\nFailed inputs:\n");
        for file in failed {
            out.push_str(&format!("  {} {}: {}\n", "✗".red(), file.path, file.error));
        }
    }
    out
}

fn render_status(entries: &[CombinedEntry], failed: &[FailedFile]) -> String {
    let mut out = String::new();
    out.push_str("\n---------------------------------------------------\n");
    let status = if entries.is_empty() {
        "STATUS: NO RESULTS".red().bold()
    } else if !failed.is_empty() {
        format!("STATUS: COMPLETED WITH {} FAILED FILES", failed.len())
            .yellow()
            .bold()
    } else {
        "STATUS: OK".green().bold()
    };
    out.push_str(&status.to_string());
    out.push('\n');
    out
}
