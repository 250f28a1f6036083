//! Accumulation of analysis results.
//!
//! This module handles:
//! - Fixed-width histograms
//! - The closed set of node values and their merge rules
//! - Hierarchical result trees and tree-to-tree merging

pub mod histogram;
pub mod tree;
pub mod value;

// Re-export main types
pub use histogram::Histogram;
pub use tree::{DataTree, MergeIssue, MergeReport, NodeId, TreeView};
pub use value::{Value, ValueKind};
