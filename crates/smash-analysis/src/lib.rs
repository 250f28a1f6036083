//! SMASH Collect
//!
//! Decoding of particle transport simulation binary output and
//! aggregation of per-run analysis results across many runs.
//!
//! This crate provides the core implementation for the
//! `smash-collect` CLI tool:
//! - `parser`: field layouts and the streaming binary decoder
//! - `aggregator`: histograms and hierarchical result trees
//! - `analysis`: per-file analyses driven by decoded blocks
//! - `combine`: grouping of runs by configuration key
//! - `output`: the results document and terminal summaries
//!
//! ## Getting Started
//!
//! ```bash
//! smash-collect run -a simple runs/7.7/particles_binary.bin:energy=7.7
//! smash-collect inspect runs/7.7/particles_binary.bin --fields p0,pz,pdg
//! ```

pub mod aggregator;
pub mod analysis;
pub mod combine;
pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;

// Re-export main types
pub use aggregator::{DataTree, Histogram, Value};
pub use combine::{Combiner, MergeKey};
pub use parser::{BinaryReader, BlockVisitor, FieldRegistry, Layout};
