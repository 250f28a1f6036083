//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in the commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while projecting a field layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field requested more than once: {0}")]
    DuplicateField(String),
}

/// Errors that can occur while decoding a binary particle file
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File header is truncated: {0}")]
    TruncatedHeader(String),

    #[error("Truncated {block} at byte {offset}: expected {expected} bytes, found {found}")]
    TruncatedRecord {
        block: &'static str,
        offset: u64,
        expected: u64,
        found: u64,
    },

    #[error("Malformed block tag 0x{tag:02x} at byte {offset}")]
    MalformedBlockTag { tag: u8, offset: u64 },

    #[error("Field '{0}' is not part of the active layout")]
    FieldNotProjected(String),

    #[error("Field '{field}' holds {actual} values, not {requested}")]
    FieldKindMismatch {
        field: String,
        requested: &'static str,
        actual: &'static str,
    },

    #[error("Particle index {index} out of range (block holds {npart})")]
    ParticleIndexOutOfRange { index: usize, npart: usize },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("Analysis '{analysis}' failed: {source}")]
    Analysis {
        analysis: String,
        #[source]
        source: Box<DecodeError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while building or merging histograms
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistogramError {
    #[error("Invalid histogram binning: [{lower}, {upper}) with {bins} bins")]
    InvalidBinning { lower: f64, upper: f64, bins: usize },

    #[error("Cannot merge histograms with different binning: {left} vs {right}")]
    BinningMismatch { left: String, right: String },
}

/// Errors raised by the aggregation tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error(transparent)]
    Histogram(#[from] HistogramError),

    #[error("Node '{path}' holds a {found} value, expected {expected}")]
    ValueKindMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors that can occur while loading run configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Invalid input specification: {0}")]
    InvalidInput(String),

    #[error("Unknown analysis: {0}")]
    UnknownAnalysis(String),

    #[error("Analysis '{analysis}' needs field '{field}', which is not in the configured layout")]
    MissingField { analysis: String, field: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
