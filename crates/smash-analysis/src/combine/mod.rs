//! Grouping of runs by configuration and merging of their results.

pub mod combiner;
pub mod key;

pub use combiner::{CombinedEntry, Combiner, Provenance};
pub use key::{parse_merge_key, KeyValue, MergeKey};
