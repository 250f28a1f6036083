//! Run configuration.
//!
//! A run is described by an optional TOML file and command-line flags; flags
//! take precedence. Example file:
//!
//! ```toml
//! fields = ["p0", "px", "py", "pz", "pdg", "ncoll"]
//! analyses = ["simple", "wounded_rapidity"]
//! output = "artifacts/auau.json"
//! fail_fast = false
//!
//! [[inputs]]
//! path = "runs/7.7/particles_binary.bin"
//! keys = { energy = 7.7, system = "AuAu" }
//! ```

use super::models::RunArgs;
use crate::combine::{parse_merge_key, MergeKey};
use crate::utils::config::{DEFAULT_FIELDS, DEFAULT_OUTPUT};
use crate::utils::error::ConfigError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of a run configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RunConfig {
    /// Record layout of the input files
    #[serde(default)]
    pub fields: Option<Vec<String>>,

    #[serde(default)]
    pub analyses: Vec<String>,

    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub inputs: Vec<InputSpec>,
}

/// One input file and the configuration it belongs to
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InputSpec {
    pub path: PathBuf,

    #[serde(default)]
    pub keys: MergeKey,
}

impl InputSpec {
    /// Parse `PATH` or `PATH:name=value,...`
    ///
    /// The text after the last `:` is a key only if it contains `=`, so plain
    /// paths with colons stay intact.
    ///
    /// # Errors
    /// * `ConfigError::InvalidInput` - empty path
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (path, keys) = match spec.rsplit_once(':') {
            Some((path, suffix)) if suffix.contains('=') => (path, parse_merge_key(suffix)),
            _ => (spec, MergeKey::new()),
        };

        if path.trim().is_empty() {
            return Err(ConfigError::InvalidInput(format!("no path in '{}'", spec)));
        }

        Ok(Self {
            path: PathBuf::from(path),
            keys,
        })
    }
}

/// Load a run configuration from a TOML file
///
/// # Errors
/// * `ConfigError::IoError` - If file cannot be read
/// * `ConfigError::ParseFailed` - If TOML is invalid
///
/// # Example
/// ```ignore
/// let config = load_config("run.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: RunConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Effective settings of one run after combining file and flags
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    pub fields: Vec<String>,
    pub analyses: Vec<String>,
    pub inputs: Vec<InputSpec>,
    pub output: PathBuf,
    pub fail_fast: bool,
}

/// Combine the configuration file (if any) with command-line arguments
///
/// Flags override file values; inputs from both are used, file inputs first.
///
/// # Errors
/// * `ConfigError::InvalidInput` - no inputs, no analyses, or a malformed input spec
pub fn resolve_run(args: &RunArgs) -> Result<ResolvedRun, ConfigError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };

    let fields = args
        .fields
        .clone()
        .or(config.fields)
        .unwrap_or_else(|| DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect());

    let selected = if args.analyses.is_empty() {
        config.analyses
    } else {
        args.analyses.clone()
    };
    let analyses = unique_analyses(selected);
    if analyses.is_empty() {
        return Err(ConfigError::InvalidInput("no analyses selected".to_string()));
    }

    let mut inputs = config.inputs;
    for spec in &args.inputs {
        inputs.push(InputSpec::parse(spec)?);
    }
    if inputs.is_empty() {
        return Err(ConfigError::InvalidInput("no input files given".to_string()));
    }

    let output = args
        .output
        .clone()
        .or(config.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    Ok(ResolvedRun {
        fields,
        analyses,
        inputs,
        output,
        fail_fast: args.fail_fast || config.fail_fast,
    })
}

/// Drop repeated analysis names, keeping the first occurrence
///
/// Two instances of one analysis would both merge into the same subtree and
/// double every count.
fn unique_analyses(selected: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut analyses = Vec::with_capacity(selected.len());
    for name in selected {
        if seen.insert(name.clone()) {
            analyses.push(name);
        } else {
            warn!("analysis '{}' selected more than once, running it once", name);
        }
    }
    analyses
}
