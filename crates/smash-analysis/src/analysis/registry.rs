//! Name-keyed table of available analyses.

use super::{midrapidity, simple, wounded, Analysis};
use crate::aggregator::{DataTree, NodeId};
use crate::parser::Layout;
use crate::utils::error::{AggregateError, ConfigError};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Builds a fresh analysis for one file
pub type Constructor = fn() -> Box<dyn Analysis>;

/// Runs on a combined tree, at the analysis' own node, after all files merged
pub type PostMergeFn = fn(&mut DataTree, NodeId) -> Result<(), AggregateError>;

/// Registration record of one analysis
#[derive(Clone)]
pub struct AnalysisEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub required_fields: &'static [&'static str],
    construct: Constructor,
    post_merge: Option<PostMergeFn>,
}

impl AnalysisEntry {
    pub fn new(
        name: &'static str,
        description: &'static str,
        required_fields: &'static [&'static str],
        construct: Constructor,
    ) -> Self {
        Self {
            name,
            description,
            required_fields,
            construct,
            post_merge: None,
        }
    }

    pub fn with_post_merge(mut self, post_merge: PostMergeFn) -> Self {
        self.post_merge = Some(post_merge);
        self
    }

    pub fn create(&self) -> Box<dyn Analysis> {
        (self.construct)()
    }

    pub fn post_merge(&self) -> Option<PostMergeFn> {
        self.post_merge
    }
}

impl fmt::Debug for AnalysisEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisEntry")
            .field("name", &self.name)
            .field("required_fields", &self.required_fields)
            .field("post_merge", &self.post_merge.is_some())
            .finish()
    }
}

/// Analyses known to a run, built once at start-up
#[derive(Debug, Clone, Default)]
pub struct AnalysisRegistry {
    entries: BTreeMap<&'static str, AnalysisEntry>,
}

impl AnalysisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in analysis
    pub fn builtin() -> Self {
        Self::new()
            .register(simple::entry())
            .register(midrapidity::entry())
            .register(wounded::entry())
    }

    /// Add an entry; a later registration under the same name replaces the earlier one
    pub fn register(mut self, entry: AnalysisEntry) -> Self {
        self.entries.insert(entry.name, entry);
        self
    }

    /// Entries sorted by name
    pub fn entries(&self) -> impl Iterator<Item = &AnalysisEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Result<&AnalysisEntry, ConfigError> {
        self.entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAnalysis(name.to_string()))
    }

    /// Instantiate a set of analyses for one file
    pub fn create_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Box<dyn Analysis>>, ConfigError> {
        names
            .iter()
            .map(|name| self.get(name.as_ref()).map(AnalysisEntry::create))
            .collect()
    }

    /// Check that every requested analysis exists and that the layout
    /// provides every field it reads
    ///
    /// **Public** - run before any input file is opened
    ///
    /// # Errors
    /// * `ConfigError::UnknownAnalysis` - name not registered
    /// * `ConfigError::MissingField` - a required field is absent from `layout`
    pub fn validate<S: AsRef<str>>(&self, names: &[S], layout: &Layout) -> Result<(), ConfigError> {
        for name in names {
            let entry = self.get(name.as_ref())?;
            if let Some(field) = entry
                .required_fields
                .iter()
                .find(|field| !layout.contains(field))
            {
                return Err(ConfigError::MissingField {
                    analysis: entry.name.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Run post-merge finalizers of `names` over a combined tree
    ///
    /// Each finalizer receives the node named after its analysis; analyses
    /// without results in this tree are skipped.
    pub fn apply_post_merge<S: AsRef<str>>(&self, names: &[S], tree: &mut DataTree) -> Result<(), AggregateError> {
        for name in names {
            let Some(entry) = self.entries.get(name.as_ref()) else {
                continue;
            };
            let Some(post_merge) = entry.post_merge else {
                continue;
            };
            let Some(node) = tree.find(tree.root(), entry.name) else {
                continue;
            };

            debug!("Running post-merge step of '{}'", entry.name);
            post_merge(tree, node)?;
        }
        Ok(())
    }
}
