use crate::analysis::AnalysisRegistry;
use crate::output::read_results;
use crate::parser::FieldRegistry;
use crate::utils::config::{DEFAULT_FIELDS, SCHEMA_VERSION};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a results JSON file
pub fn validate_results_file(file_path: PathBuf) -> Result<()> {
    println!("Validating results: {}", file_path.display());

    let document = read_results(&file_path)
        .with_context(|| format!("Invalid results file {}", file_path.display()))?;

    println!("✓ Valid results JSON");
    println!("  Version: {}", document.version);
    println!("  Generated: {}", document.generated_at);
    println!("  Analyses: {}", document.analyses.join(", "));
    println!("  Configurations: {}", document.results.len());
    for result in &document.results {
        println!("    {} ({} files)", result.label, result.sources.len());
    }
    println!("  Failed Files: {}", document.failed_files.len());

    Ok(())
}

/// List every field the decoder can project
pub fn display_fields(registry: &FieldRegistry) {
    println!("Known particle fields (record order is given per run):");
    println!();
    for field in registry.fields() {
        let marker = if DEFAULT_FIELDS.contains(&field.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "  {} {:<14} {:<8} {}",
            marker,
            field.name,
            field.kind.label(),
            field.description
        );
    }

    let aliases = registry.aliases();
    if !aliases.is_empty() {
        println!();
        println!("Aliases:");
        for (alias, target) in aliases {
            println!("  {:<16} -> {}", alias, target);
        }
    }

    println!();
    println!("* part of the default layout");
}

/// List registered analyses and the fields they read
pub fn display_analyses(registry: &AnalysisRegistry) {
    println!("Registered analyses:");
    for entry in registry.entries() {
        println!();
        println!("  {}", entry.name);
        println!("    {}", entry.description);
        println!("    requires: {}", entry.required_fields.join(", "));
        if entry.post_merge().is_some() {
            println!("    post-merge step: yes");
        }
    }
}

/// Display version information
pub fn display_version() {
    println!("smash-collect v{}", env!("CARGO_PKG_VERSION"));
    println!("Results Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Decoding and multi-run aggregation of particle transport simulation output.");
}
