//! JSON results writer and reader.

use super::schema::ResultsDocument;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write a results document to a JSON file
///
/// **Public** - main entry point for batch output
///
/// # Arguments
/// * `document` - Combined results of the run
/// * `output_path` - Path to output JSON file; parent directories are created
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
///
/// # Example
/// ```ignore
/// let document = ResultsDocument::from_entries(combiner.entries(), &analyses, failed)?;
/// write_results(&document, "artifacts/results.json")?;
/// ```
pub fn write_results(document: &ResultsDocument, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing results to: {}", output_path.display());

    super::validate_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)?;

    info!(
        "Results written ({} configurations, {} bytes)",
        document.results.len(),
        std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0)
    );

    Ok(())
}

/// Read a results document back from disk
///
/// **Public** - used by the `validate` command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - file read error (I/O errors share the variant)
/// * `OutputError::SerializationFailed` - not a results document
pub fn read_results(input_path: impl AsRef<Path>) -> Result<ResultsDocument, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading results from: {}", input_path.display());

    let file = File::open(input_path)?;
    let document: ResultsDocument = serde_json::from_reader(std::io::BufReader::new(file))?;

    debug!(
        "Results loaded: version {}, {} configurations",
        document.version,
        document.results.len()
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::schema::{ConfigResult, FailedFile};
    use crate::combine::parse_merge_key;
    use tempfile::tempdir;

    fn document() -> ResultsDocument {
        ResultsDocument {
            version: "1.0.0".to_string(),
            generated_at: "2026-01-01T00:00:00+00:00".to_string(),
            analyses: vec!["simple".to_string()],
            results: vec![ConfigResult {
                label: "energy_7.700000".to_string(),
                merge_keys: parse_merge_key("energy=7.7"),
                producer_versions: vec!["SMASH-3.1".to_string()],
                sources: vec!["a.bin".to_string()],
                merge_issues: 0,
                data: serde_json::json!({"simple": {"n_events": 3}}),
            }],
            failed_files: vec![FailedFile {
                path: "broken.bin".to_string(),
                error: "Truncated particle data".to_string(),
            }],
        }
    }

    #[test]
    fn test_write_creates_parents_and_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out/results.json");

        write_results(&document(), &path).unwrap();
        let loaded = read_results(&path).unwrap();

        assert_eq!(loaded, document());
        assert_eq!(
            loaded.results[0].pointer("simple/n_events"),
            Some(&serde_json::json!(3))
        );
    }

    #[test]
    fn test_directory_path_rejected() {
        let dir = tempdir().unwrap();
        let result = write_results(&document(), dir.path());
        assert!(matches!(result, Err(OutputError::InvalidPath(_))));
    }

    #[test]
    fn test_read_rejects_other_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(&path, r#"{"hello": "world"}"#).unwrap();
        assert!(matches!(
            read_results(&path),
            Err(OutputError::SerializationFailed(_))
        ));
    }
}
