//! SMASH Collect CLI
//!
//! Decodes particle binary files, runs analyses on them and combines the
//! results of runs that share a configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use smash_analysis::analysis::AnalysisRegistry;
use smash_analysis::commands::{
    display_analyses, display_fields, display_version, execute_inspect, execute_run,
    validate_results_file, InspectArgs, RunArgs,
};
use smash_analysis::parser::FieldRegistry;

/// SMASH Collect - multi-run aggregation of particle simulation output
#[derive(Parser, Debug)]
#[command(name = "smash-collect")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode input files, run analyses and combine results by configuration
    Run {
        /// Input files, `PATH` or `PATH:name=value,...`
        inputs: Vec<String>,

        /// Run configuration file (TOML)
        #[arg(short, long, env = "SMASH_COLLECT_CONFIG")]
        config: Option<PathBuf>,

        /// Record layout, comma separated (e.g. p0,px,py,pz,pdg)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// Analysis to run (repeatable)
        #[arg(short, long = "analysis")]
        analyses: Vec<String>,

        /// Output path for the results document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort on the first input that fails
        #[arg(long)]
        fail_fast: bool,

        /// Print a summary of the combined trees
        #[arg(long)]
        summary: bool,

        /// Tree depth shown in the summary
        #[arg(long, default_value = "3")]
        depth: usize,
    },

    /// Print the header and blocks of one binary file
    Inspect {
        /// Binary particle file
        input: PathBuf,

        /// Record layout, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// Number of blocks listed
        #[arg(long, default_value = "10")]
        blocks: usize,

        /// Particles printed per listed block
        #[arg(long, default_value = "0")]
        particles: usize,
    },

    /// List known particle fields
    Fields,

    /// List registered analyses
    Analyses,

    /// Validate a results JSON file
    Validate {
        /// Path to results JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Run {
            inputs,
            config,
            fields,
            analyses,
            output,
            fail_fast,
            summary,
            depth,
        } => {
            let args = RunArgs {
                inputs,
                config,
                fields,
                analyses,
                output,
                fail_fast,
                print_summary: summary,
                summary_depth: depth,
            };

            let report = execute_run(args)?;
            if !report.failed_files.is_empty() {
                log::warn!(
                    "{} of {} inputs failed",
                    report.failed_files.len(),
                    report.failed_files.len() + report.files_merged
                );
            }
        }

        Commands::Inspect {
            input,
            fields,
            blocks,
            particles,
        } => {
            execute_inspect(InspectArgs {
                input,
                fields,
                max_blocks: blocks,
                max_particles: particles,
            })?;
        }

        Commands::Fields => {
            display_fields(&FieldRegistry::standard());
        }

        Commands::Analyses => {
            display_analyses(&AnalysisRegistry::builtin());
        }

        Commands::Validate { file } => {
            validate_results_file(file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
