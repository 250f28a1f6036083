//! Multi-run combiner: one merged result tree per configuration key.

use super::key::MergeKey;
use crate::aggregator::{DataTree, MergeReport};
use crate::utils::error::AggregateError;
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Where one contribution came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub path: PathBuf,
    pub producer_version: String,
}

/// Merged state for one configuration
#[derive(Debug, Clone)]
pub struct CombinedEntry {
    pub key: MergeKey,
    pub tree: DataTree,
    pub sources: Vec<PathBuf>,
    pub producer_versions: BTreeSet<String>,
    /// Merge conflicts seen while combining this entry
    pub issues: usize,
}

impl CombinedEntry {
    pub fn label(&self) -> String {
        self.key.label()
    }
}

/// Accumulates per-file trees, keeping entries sorted by key
#[derive(Debug, Default)]
pub struct Combiner {
    entries: Vec<CombinedEntry>,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file's tree under `key`
    ///
    /// **Public** - called once per successfully decoded file
    ///
    /// A new key is inserted at its sorted position. An existing key is
    /// checked for binning conflicts first and then merged in place.
    ///
    /// # Errors
    /// * `AggregateError::Histogram` - binning mismatch; the stored entry is unchanged
    pub fn upsert(
        &mut self,
        key: MergeKey,
        tree: DataTree,
        provenance: Provenance,
    ) -> Result<MergeReport, AggregateError> {
        match self.entries.binary_search_by(|entry| entry.key.cmp(&key)) {
            Ok(index) => {
                let entry = &mut self.entries[index];
                entry.tree.check_mergeable(&tree)?;
                let report = entry.tree.merge(&tree)?;

                entry.issues += report.issues.len();
                entry.sources.push(provenance.path);
                entry.producer_versions.insert(provenance.producer_version);

                debug!(
                    "Merged into '{}' ({} sources)",
                    entry.key.label(),
                    entry.sources.len()
                );
                Ok(report)
            }
            Err(index) => {
                info!("New configuration '{}'", key.label());
                self.entries.insert(
                    index,
                    CombinedEntry {
                        key,
                        tree,
                        sources: vec![provenance.path],
                        producer_versions: BTreeSet::from([provenance.producer_version]),
                        issues: 0,
                    },
                );
                Ok(MergeReport::default())
            }
        }
    }

    pub fn get(&self, key: &MergeKey) -> Option<&CombinedEntry> {
        self.entries
            .binary_search_by(|entry| entry.key.cmp(key))
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Final result set in canonical key order
    pub fn entries(&self) -> &[CombinedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CombinedEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a post-merge step over every entry, stopping at the first error
    pub fn finalize_with<E>(
        &mut self,
        mut step: impl FnMut(&MergeKey, &mut DataTree) -> Result<(), E>,
    ) -> Result<(), E> {
        for entry in &mut self.entries {
            step(&entry.key, &mut entry.tree)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Histogram;
    use crate::combine::key::parse_merge_key;

    fn provenance(path: &str) -> Provenance {
        Provenance {
            path: PathBuf::from(path),
            producer_version: "SMASH-3.1".to_string(),
        }
    }

    fn tree_with_bins(lower: f64, upper: f64, bins: usize) -> DataTree {
        let mut tree = DataTree::new();
        let root = tree.root();
        let node = tree.child(root, "h");
        tree.set_value(node, Histogram::new(lower, upper, bins).unwrap());
        tree
    }

    #[test]
    fn test_entries_stay_sorted() {
        let mut combiner = Combiner::new();
        for text in ["energy=11.5", "energy=7.7", "energy=9.2"] {
            combiner
                .upsert(parse_merge_key(text), DataTree::new(), provenance(text))
                .unwrap();
        }

        let labels: Vec<String> = combiner.entries().iter().map(CombinedEntry::label).collect();
        assert_eq!(
            labels,
            vec!["energy_7.700000", "energy_9.200000", "energy_11.500000"]
        );
    }

    #[test]
    fn test_failed_merge_keeps_state() {
        let mut combiner = Combiner::new();
        let key = parse_merge_key("energy=7.7");
        combiner
            .upsert(key.clone(), tree_with_bins(0.0, 1.0, 2), provenance("a"))
            .unwrap();

        let result = combiner.upsert(key.clone(), tree_with_bins(0.0, 1.0, 3), provenance("b"));
        assert!(result.is_err());

        let entry = combiner.get(&key).unwrap();
        assert_eq!(entry.tree, tree_with_bins(0.0, 1.0, 2));
        assert_eq!(entry.sources, vec![PathBuf::from("a")]);
    }

    #[test]
    fn test_nested_binning_mismatch_leaves_siblings_unmerged() {
        let build = |count: i64, bins: usize| {
            let mut tree = DataTree::new();
            let root = tree.root();
            let n = tree.path(root, "spectra/count");
            tree.set_value(n, count);
            let h = tree.path(root, "spectra/z/h");
            tree.set_value(h, Histogram::new(0.0, 1.0, bins).unwrap());
            tree
        };

        let mut combiner = Combiner::new();
        let key = parse_merge_key("energy=7.7");
        combiner.upsert(key.clone(), build(1, 2), provenance("a")).unwrap();

        // "count" sorts before "z", so an in-place merge would already have added it
        let mut incoming = build(5, 3);
        let root = incoming.root();
        let extra = incoming.path(root, "extra");
        incoming.set_value(extra, 1i64);
        assert!(combiner.upsert(key.clone(), incoming, provenance("b")).is_err());

        let entry = combiner.get(&key).unwrap();
        assert_eq!(entry.tree, build(1, 2));
        assert_eq!(entry.issues, 0);

        let report = combiner.upsert(key.clone(), build(2, 2), provenance("c")).unwrap();
        assert!(report.is_clean());
        let entry = combiner.get(&key).unwrap();
        let n = entry.tree.find(entry.tree.root(), "spectra/count").unwrap();
        assert_eq!(entry.tree.int(n), Some(3));
        assert_eq!(entry.sources, vec![PathBuf::from("a"), PathBuf::from("c")]);
    }

    #[test]
    fn test_finalize_with_visits_every_entry() {
        let mut combiner = Combiner::new();
        combiner
            .upsert(parse_merge_key("a=1"), DataTree::new(), provenance("x"))
            .unwrap();
        combiner
            .upsert(parse_merge_key("a=2"), DataTree::new(), provenance("y"))
            .unwrap();

        combiner
            .finalize_with(|_, tree| {
                let root = tree.root();
                let done = tree.child(root, "done");
                tree.set_value(done, 1i64);
                Ok::<(), AggregateError>(())
            })
            .unwrap();

        assert!(combiner
            .entries()
            .iter()
            .all(|entry| entry.tree.find(entry.tree.root(), "done").is_some()));
    }
}
