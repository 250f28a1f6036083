//! Run command implementation.
//!
//! The run command:
//! 1. Resolves configuration and input list
//! 2. Projects the record layout and checks every analysis against it
//! 3. Decodes each input through the selected analyses
//! 4. Combines per-file trees by configuration key
//! 5. Applies post-merge steps
//! 6. Writes the results document

use super::config::{resolve_run, InputSpec, ResolvedRun};
use super::models::RunArgs;
use crate::aggregator::DataTree;
use crate::analysis::{Analysis, AnalysisRegistry, Dispatcher};
use crate::combine::{Combiner, Provenance};
use crate::output::{render_terminal_summary, write_results, FailedFile, ResultsDocument};
use crate::parser::{BinaryReader, FieldRegistry};
use crate::utils::error::DecodeError;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub configurations: usize,
    pub files_merged: usize,
    pub failed_files: Vec<FailedFile>,
}

/// Execute the run command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Run command arguments
///
/// # Returns
/// Summary of the run; failed inputs are listed, not fatal (unless `fail_fast`)
///
/// # Errors
/// * Configuration errors (unknown analysis or field, missing inputs)
/// * The first failing input when `fail_fast` is set
/// * Output write errors
///
/// # Example
/// ```ignore
/// let args = RunArgs {
///     inputs: vec!["runs/7.7/particles_binary.bin:energy=7.7".to_string()],
///     analyses: vec!["simple".to_string()],
///     ..RunArgs::default()
/// };
/// let report = execute_run(args)?;
/// ```
pub fn execute_run(args: RunArgs) -> Result<RunReport> {
    let start_time = Instant::now();

    // Step 1: Resolve configuration
    let run = resolve_run(&args).context("Invalid run configuration")?;
    info!(
        "Running {} on {} inputs",
        run.analyses.join(", "),
        run.inputs.len()
    );

    // Step 2: Check the layout and analyses before touching any input
    let fields = FieldRegistry::standard();
    let layout = fields
        .project(&run.fields)
        .context("Invalid field layout")?;
    let analyses = AnalysisRegistry::builtin();
    analyses
        .validate(&run.analyses, &layout)
        .context("Analysis cannot run on this layout")?;
    debug!("Record width: {} bytes", layout.record_width());

    // Step 3 + 4: Decode and combine
    let mut combiner = Combiner::new();
    let mut failed_files = Vec::new();

    for input in &run.inputs {
        let instances = analyses
            .create_all(&run.analyses)
            .context("Failed to create analyses")?;

        match process_input(input, &run.fields, &fields, instances) {
            Ok((tree, producer_version)) => {
                let provenance = Provenance {
                    path: input.path.clone(),
                    producer_version,
                };
                if let Err(e) = combiner.upsert(input.keys.clone(), tree, provenance) {
                    record_failure(&run, &mut failed_files, input, &DecodeError::from(e))?;
                }
            }
            Err(e) => record_failure(&run, &mut failed_files, input, &e)?,
        }
    }

    // Step 5: Post-merge steps
    combiner
        .finalize_with(|_, tree| analyses.apply_post_merge(&run.analyses, tree))
        .context("Post-merge step failed")?;

    // Step 6: Write output
    let document = ResultsDocument::from_entries(combiner.entries(), &run.analyses, failed_files.clone())
        .context("Failed to build results document")?;
    write_results(&document, &run.output).context("Failed to write results")?;
    info!("✓ Results written to: {}", run.output.display());

    if args.print_summary {
        println!(
            "{}",
            render_terminal_summary(combiner.entries(), &failed_files, args.summary_depth)
        );
    }

    let files_merged: usize = combiner.entries().iter().map(|entry| entry.sources.len()).sum();
    info!(
        "Run completed in {:.2}s: {} files in {} configurations, {} failed",
        start_time.elapsed().as_secs_f64(),
        files_merged,
        combiner.len(),
        failed_files.len()
    );

    Ok(RunReport {
        output: run.output,
        configurations: combiner.len(),
        files_merged,
        failed_files,
    })
}

/// Decode one input through a set of fresh analysis instances
///
/// **Public** - also used by tests to obtain a single file's tree
///
/// # Returns
/// The file's result tree and the producer version from its header
pub fn process_input<S: AsRef<str>>(
    input: &InputSpec,
    layout_fields: &[S],
    fields: &FieldRegistry,
    instances: Vec<Box<dyn Analysis>>,
) -> Result<(DataTree, String), DecodeError> {
    info!("Reading {}", input.path.display());

    let reader = BinaryReader::open(&input.path, layout_fields, fields)?;
    let mut dispatcher = Dispatcher::new(instances);
    let summary = reader.run(&mut dispatcher)?;
    debug!(
        "{}: {} particle blocks, {} end blocks, {} particles",
        input.path.display(),
        summary.particle_blocks,
        summary.end_blocks,
        summary.particles
    );

    let producer_version = dispatcher.producer_version().to_string();
    Ok((dispatcher.into_tree()?, producer_version))
}

/// Note a failed input, or abort the run under `fail_fast`
fn record_failure(
    run: &ResolvedRun,
    failed_files: &mut Vec<FailedFile>,
    input: &InputSpec,
    error: &DecodeError,
) -> Result<()> {
    if run.fail_fast {
        anyhow::bail!("Failed to process {}: {}", input.path.display(), error);
    }

    warn!("Skipping {}: {}", input.path.display(), error);
    failed_files.push(FailedFile {
        path: input.path.display().to_string(),
        error: error.to_string(),
    });
    Ok(())
}
