//! Results document schema.
//!
//! One document is written per batch run. Every distinct configuration key
//! contributes one entry holding its merged result tree.

use crate::combine::{CombinedEntry, MergeKey};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use serde::{Deserialize, Serialize};

/// Top-level results document written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    /// Schema version for compatibility checking
    pub version: String,

    /// RFC 3339 timestamp of the run
    pub generated_at: String,

    /// Analyses that were active in the run
    #[serde(default)]
    pub analyses: Vec<String>,

    /// One entry per configuration, in canonical key order
    pub results: Vec<ConfigResult>,

    /// Inputs that could not be decoded
    #[serde(default)]
    pub failed_files: Vec<FailedFile>,
}

/// Merged results of every file sharing one configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResult {
    /// Key label, e.g. `energy_7.700000`
    pub label: String,

    pub merge_keys: MergeKey,

    /// Producer versions found in the file headers
    pub producer_versions: Vec<String>,

    /// Input files merged into this entry
    pub sources: Vec<String>,

    /// Number of merge conflicts that were resolved
    #[serde(default)]
    pub merge_issues: usize,

    /// Serialized result tree
    pub data: serde_json::Value,
}

/// An input that failed, with its error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

impl ResultsDocument {
    /// Build a document from the combiner's final entries
    pub fn from_entries(
        entries: &[CombinedEntry],
        analyses: &[String],
        failed_files: Vec<FailedFile>,
    ) -> Result<Self, OutputError> {
        let results = entries
            .iter()
            .map(ConfigResult::from_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            analyses: analyses.to_vec(),
            results,
            failed_files,
        })
    }

    pub fn result(&self, label: &str) -> Option<&ConfigResult> {
        self.results.iter().find(|result| result.label == label)
    }
}

impl ConfigResult {
    fn from_entry(entry: &CombinedEntry) -> Result<Self, OutputError> {
        Ok(Self {
            label: entry.label(),
            merge_keys: entry.key.clone(),
            producer_versions: entry.producer_versions.iter().cloned().collect(),
            sources: entry
                .sources
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            merge_issues: entry.issues,
            data: serde_json::to_value(entry.tree.view())?,
        })
    }

    /// Value at a `/`-separated path inside `data`
    pub fn pointer(&self, path: &str) -> Option<&serde_json::Value> {
        let pointer: String = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("/{}", segment.replace('~', "~0")))
            .collect();
        self.data.pointer(&pointer)
    }
}
