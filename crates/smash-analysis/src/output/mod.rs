//! Output writers for combined results.
//!
//! This module handles:
//! - The versioned results document schema
//! - JSON output (pretty) and reading it back
//! - Terminal summaries

pub mod json;
pub mod schema;
pub mod summary;

// Re-export main functions
pub use json::{read_results, write_results};
pub use schema::{ConfigResult, FailedFile, ResultsDocument};
pub use summary::render_terminal_summary;

use crate::utils::error::OutputError;
use std::path::Path;

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
