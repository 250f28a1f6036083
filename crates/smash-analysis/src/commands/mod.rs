//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod config;
pub mod inspect;
pub mod models;
pub mod run;
pub mod utils;

// Re-export main command functions
pub use config::{load_config, resolve_run, InputSpec, ResolvedRun, RunConfig};
pub use inspect::execute_inspect;
pub use models::{InspectArgs, RunArgs};
pub use run::{execute_run, process_input, RunReport};
pub use utils::{display_analyses, display_fields, display_version, validate_results_file};
