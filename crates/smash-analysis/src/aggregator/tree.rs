//! Hierarchical aggregation tree.
//!
//! Nodes live in an arena and are addressed by `NodeId`. A node holds at
//! most one `Value` plus name-sorted children. Analyses create nodes on
//! demand (`child`, `path`) and fill them in place; trees from different
//! files are combined with `merge`.
//!
//! Merge rules:
//! - an empty node takes over the other side unconditionally
//! - two leaves of the same kind combine (`Value::merge_same_kind`)
//! - two leaves of different kinds keep the higher-precedence kind
//! - two inner nodes merge child by child; differing self values keep the
//!   greater one under `Value::canonical_cmp`
//! - leaf against inner node keeps the inner node
//! - differing root names keep the lexicographically smaller name, unless
//!   one root is empty and the other side is taken whole
//!
//! Every tie-break is symmetric, so merge is commutative and associative
//! apart from sequence concatenation order. Conflicts are reported, not fatal;
//! only a histogram binning mismatch aborts a merge.

use super::histogram::Histogram;
use super::value::{Value, ValueKind};
use crate::utils::error::{AggregateError, HistogramError};
use log::warn;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a node of one `DataTree`
///
/// Only meaningful for the tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    value: Option<Value>,
    children: BTreeMap<String, NodeId>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            value: None,
            children: BTreeMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn is_leaf(&self) -> bool {
        self.value.is_some() && self.children.is_empty()
    }
}

/// A non-fatal inconsistency found while merging
#[derive(Debug, Clone, PartialEq)]
pub enum MergeIssue {
    /// Root names differ
    NameMismatch { left: String, right: String, kept: String },

    /// Two leaves hold values of different kinds
    TypeConflict {
        path: String,
        left: ValueKind,
        right: ValueKind,
        kept: ValueKind,
    },

    /// A leaf met a node with children; the node with children was kept
    LeafShapeConflict { path: String },

    /// Two inner nodes carry different self values
    ValueMismatch { path: String },
}

impl fmt::Display for MergeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeIssue::NameMismatch { left, right, kept } => {
                write!(f, "name mismatch: '{}' vs '{}', keeping '{}'", left, right, kept)
            }
            MergeIssue::TypeConflict {
                path,
                left,
                right,
                kept,
            } => write!(
                f,
                "type conflict in '{}': {} vs {}, keeping {}",
                path, left, right, kept
            ),
            MergeIssue::LeafShapeConflict { path } => {
                write!(f, "mixing leaf and non-leaf nodes in '{}'", path)
            }
            MergeIssue::ValueMismatch { path } => write!(f, "node value mismatch in '{}'", path),
        }
    }
}

/// Issues collected during one merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub issues: Vec<MergeIssue>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn extend(&mut self, other: MergeReport) {
        self.issues.extend(other.issues);
    }
}

/// Arena-backed aggregation tree
#[derive(Debug, Clone)]
pub struct DataTree {
    nodes: Vec<Node>,
}

impl DataTree {
    /// Create a tree with an unnamed, empty root
    pub fn new() -> Self {
        Self::named("")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(name.into(), None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Whether the root has neither a value nor children
    pub fn is_empty(&self) -> bool {
        self.nodes[0].is_empty()
    }

    pub fn is_empty_node(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_empty()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].is_leaf()
    }

    /// Number of nodes ever created (placeholders included)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Child `name` of `parent`, created empty if absent
    pub fn child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent.0].children.get(name) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name.to_string(), Some(parent)));
        self.nodes[parent.0].children.insert(name.to_string(), id);
        id
    }

    /// Walk (and create) a `/`-separated path below `parent`
    ///
    /// Empty segments are skipped, so `"a//b/"` equals `"a/b"`.
    pub fn path(&mut self, parent: NodeId, path: &str) -> NodeId {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(parent, |node, segment| self.child(node, segment))
    }

    /// Look up a `/`-separated path below `parent` without creating anything
    pub fn find(&self, parent: NodeId, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(parent, |node, segment| {
                self.nodes[node.0].children.get(segment).copied()
            })
    }

    /// Children of a node in name order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> {
        self.nodes[id.0]
            .children
            .iter()
            .map(|(name, &child)| (name.as_str(), child))
    }

    /// Slash-separated path from the root to `id` (empty for the root)
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            segments.push(self.nodes[current.0].name.as_str());
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Depth-first, name-ordered listing of the nodes below `id` with their depth
    pub fn descendants(&self, id: NodeId) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = self
            .children(id)
            .map(|(_, child)| (child, 1))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        while let Some((node, depth)) = stack.pop() {
            out.push((node, depth));
            let below: Vec<NodeId> = self.children(node).map(|(_, child)| child).collect();
            stack.extend(below.into_iter().rev().map(|child| (child, depth + 1)));
        }
        out
    }

    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.nodes[id.0].value.as_ref()
    }

    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut Value> {
        self.nodes[id.0].value.as_mut()
    }

    /// Store a value, returning the previous one
    pub fn set_value(&mut self, id: NodeId, value: impl Into<Value>) -> Option<Value> {
        self.nodes[id.0].value.replace(value.into())
    }

    pub fn take_value(&mut self, id: NodeId) -> Option<Value> {
        self.nodes[id.0].value.take()
    }

    pub fn int(&self, id: NodeId) -> Option<i64> {
        match self.value(id) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, id: NodeId) -> Option<f64> {
        match self.value(id) {
            Some(Value::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn histogram(&self, id: NodeId) -> Option<&Histogram> {
        match self.value(id) {
            Some(Value::Histogram(h)) => Some(h),
            _ => None,
        }
    }

    /// Add to an integer node (created as 0 if valueless), returning the new total
    ///
    /// # Errors
    /// * `AggregateError::ValueKindMismatch` - the node holds another kind
    pub fn add_int(&mut self, id: NodeId, delta: i64) -> Result<i64, AggregateError> {
        match self.slot_or_insert(id, ValueKind::Int, || Value::Int(0))? {
            Value::Int(v) => {
                *v += delta;
                Ok(*v)
            }
            other => {
                let found = other.kind();
                Err(self.kind_mismatch(id, ValueKind::Int, found))
            }
        }
    }

    /// Add to a float node (created as 0.0 if valueless), returning the new total
    pub fn add_float(&mut self, id: NodeId, delta: f64) -> Result<f64, AggregateError> {
        match self.slot_or_insert(id, ValueKind::Float, || Value::Float(0.0))? {
            Value::Float(v) => {
                *v += delta;
                Ok(*v)
            }
            other => {
                let found = other.kind();
                Err(self.kind_mismatch(id, ValueKind::Float, found))
            }
        }
    }

    /// Append to an integer sequence node
    pub fn push_int(&mut self, id: NodeId, item: i64) -> Result<(), AggregateError> {
        match self.slot_or_insert(id, ValueKind::IntSeq, || Value::IntSeq(Vec::new()))? {
            Value::IntSeq(v) => {
                v.push(item);
                Ok(())
            }
            other => {
                let found = other.kind();
                Err(self.kind_mismatch(id, ValueKind::IntSeq, found))
            }
        }
    }

    /// Append to a float sequence node
    pub fn push_float(&mut self, id: NodeId, item: f64) -> Result<(), AggregateError> {
        match self.slot_or_insert(id, ValueKind::FloatSeq, || Value::FloatSeq(Vec::new()))? {
            Value::FloatSeq(v) => {
                v.push(item);
                Ok(())
            }
            other => {
                let found = other.kind();
                Err(self.kind_mismatch(id, ValueKind::FloatSeq, found))
            }
        }
    }

    /// Histogram stored at `id`, inserting `make()` if the node has no value
    ///
    /// # Errors
    /// * `AggregateError::ValueKindMismatch` - the node holds another kind
    /// * `AggregateError::Histogram` - `make` failed
    pub fn histogram_or_insert_with(
        &mut self,
        id: NodeId,
        make: impl FnOnce() -> Result<Histogram, HistogramError>,
    ) -> Result<&mut Histogram, AggregateError> {
        match self.value(id).map(Value::kind) {
            None => self.nodes[id.0].value = Some(Value::Histogram(make()?)),
            Some(ValueKind::Histogram) => {}
            Some(found) => return Err(self.kind_mismatch(id, ValueKind::Histogram, found)),
        }

        match self.nodes[id.0].value.as_mut() {
            Some(Value::Histogram(h)) => Ok(h),
            other => Err(AggregateError::ValueKindMismatch {
                path: format!("#{}", id.0),
                expected: ValueKind::Histogram.label(),
                found: other.map_or("none", |value| value.kind().label()),
            }),
        }
    }

    fn slot_or_insert(
        &mut self,
        id: NodeId,
        expected: ValueKind,
        make: impl FnOnce() -> Value,
    ) -> Result<&mut Value, AggregateError> {
        if let Some(found) = self.value(id).map(Value::kind) {
            if found != expected {
                return Err(self.kind_mismatch(id, expected, found));
            }
        }
        Ok(self.nodes[id.0].value.get_or_insert_with(make))
    }

    fn kind_mismatch(&self, id: NodeId, expected: ValueKind, found: ValueKind) -> AggregateError {
        AggregateError::ValueKindMismatch {
            path: display_path(&self.path_of(id)),
            expected: expected.label(),
            found: found.label(),
        }
    }

    /// Merge another tree into this one, root to root
    ///
    /// **Public** - used by the combiner for trees of the same configuration
    ///
    /// Conflicts are logged and returned in the report. On error `self` may be
    /// partially merged; callers that must stay consistent run
    /// `check_mergeable` first.
    ///
    /// # Errors
    /// * `AggregateError::Histogram` - two histograms at the same path differ in binning
    pub fn merge(&mut self, other: &DataTree) -> Result<MergeReport, AggregateError> {
        let mut report = MergeReport::default();

        let mine = self.nodes[0].name.clone();
        let theirs = other.nodes[0].name.clone();
        let mine_absorbs = self.nodes[0].is_empty() && !other.nodes[0].is_empty();
        let theirs_absorbs = other.nodes[0].is_empty() && !self.nodes[0].is_empty();
        if mine_absorbs || (mine.is_empty() && !theirs_absorbs) {
            self.nodes[0].name = theirs;
        } else if !theirs_absorbs && !theirs.is_empty() && mine != theirs {
            let kept = mine.clone().min(theirs.clone());
            self.nodes[0].name = kept.clone();
            report.issues.push(MergeIssue::NameMismatch {
                left: mine,
                right: theirs,
                kept,
            });
        }

        let root = self.root();
        self.merge_node(root, other, other.root(), &mut report)?;

        for issue in &report.issues {
            warn!("merge: {}", issue);
        }
        Ok(report)
    }

    /// Fail exactly when `merge(other)` would, without touching either tree
    ///
    /// Walks the node pairs `merge` would combine; only two histogram leaves
    /// with different binning can abort a merge.
    ///
    /// # Errors
    /// * `AggregateError::Histogram` - two histograms at the same path differ in binning
    pub fn check_mergeable(&self, other: &DataTree) -> Result<(), AggregateError> {
        self.check_node(self.root(), other, other.root())
    }

    fn check_node(&self, at: NodeId, other: &DataTree, from: NodeId) -> Result<(), AggregateError> {
        let mine = &self.nodes[at.0];
        let theirs = &other.nodes[from.0];
        if mine.is_empty() || theirs.is_empty() {
            return Ok(());
        }

        match (mine.is_leaf(), theirs.is_leaf()) {
            (true, true) => {
                if let (Some(Value::Histogram(a)), Some(Value::Histogram(b))) = (&mine.value, &theirs.value) {
                    a.check_binning(b)?;
                }
            }
            (false, false) => {
                for (name, &child_from) in &theirs.children {
                    if let Some(&child_at) = mine.children.get(name) {
                        self.check_node(child_at, other, child_from)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Merge the subtree of `other` at `from` into the node `at` of this tree
    ///
    /// Node names are not compared; `at` keeps its own name.
    pub fn merge_at(
        &mut self,
        at: NodeId,
        other: &DataTree,
        from: NodeId,
    ) -> Result<MergeReport, AggregateError> {
        let mut report = MergeReport::default();
        self.merge_node(at, other, from, &mut report)?;

        for issue in &report.issues {
            warn!("merge: {}", issue);
        }
        Ok(report)
    }

    fn merge_node(
        &mut self,
        at: NodeId,
        other: &DataTree,
        from: NodeId,
        report: &mut MergeReport,
    ) -> Result<(), AggregateError> {
        let theirs = &other.nodes[from.0];
        if theirs.is_empty() {
            return Ok(());
        }
        if self.nodes[at.0].is_empty() {
            self.copy_subtree(at, other, from);
            return Ok(());
        }

        let mine_leaf = self.nodes[at.0].is_leaf();
        let theirs_leaf = theirs.is_leaf();

        match (mine_leaf, theirs_leaf) {
            (true, true) => {
                let Some(incoming) = theirs.value.as_ref() else {
                    return Ok(());
                };
                let merged = match self.nodes[at.0].value.as_mut() {
                    Some(mine) => mine.merge_same_kind(incoming)?,
                    None => false,
                };

                if !merged {
                    let left = self.value(at).map(Value::kind).unwrap_or(ValueKind::Int);
                    let right = incoming.kind();
                    if right > left {
                        self.nodes[at.0].value = Some(incoming.clone());
                    }
                    report.issues.push(MergeIssue::TypeConflict {
                        path: display_path(&self.path_of(at)),
                        left,
                        right,
                        kept: left.max(right),
                    });
                }
            }
            (false, false) => {
                if let Some(incoming) = theirs.value.as_ref() {
                    match self.value(at) {
                        None => self.nodes[at.0].value = Some(incoming.clone()),
                        Some(mine) if mine != incoming => {
                            if incoming.canonical_cmp(mine).is_gt() {
                                self.nodes[at.0].value = Some(incoming.clone());
                            }
                            report.issues.push(MergeIssue::ValueMismatch {
                                path: display_path(&self.path_of(at)),
                            });
                        }
                        Some(_) => {}
                    }
                }

                for (name, &child_from) in &theirs.children {
                    let child_at = self.child(at, name);
                    self.merge_node(child_at, other, child_from, report)?;
                }
            }
            (true, false) => {
                report.issues.push(MergeIssue::LeafShapeConflict {
                    path: display_path(&self.path_of(at)),
                });
                self.nodes[at.0].value = None;
                self.copy_subtree(at, other, from);
            }
            (false, true) => {
                report.issues.push(MergeIssue::LeafShapeConflict {
                    path: display_path(&self.path_of(at)),
                });
            }
        }

        Ok(())
    }

    /// Copy value and children of `from` into the empty node `at`
    fn copy_subtree(&mut self, at: NodeId, other: &DataTree, from: NodeId) {
        let theirs = &other.nodes[from.0];
        self.nodes[at.0].value = theirs.value.clone();
        for (name, &child_from) in &theirs.children {
            let child_at = self.child(at, name);
            self.copy_subtree(child_at, other, child_from);
        }
    }

    /// Serializable view of the whole tree
    pub fn view(&self) -> TreeView<'_> {
        self.view_at(self.root())
    }

    pub fn view_at(&self, id: NodeId) -> TreeView<'_> {
        TreeView { tree: self, id }
    }

    fn node_eq(&self, id: NodeId, other: &DataTree, other_id: NodeId) -> bool {
        let mine = &self.nodes[id.0];
        let theirs = &other.nodes[other_id.0];

        mine.value == theirs.value
            && mine.children.len() == theirs.children.len()
            && mine
                .children
                .iter()
                .zip(&theirs.children)
                .all(|((name_a, &a), (name_b, &b))| name_a == name_b && self.node_eq(a, other, b))
    }
}

impl Default for DataTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: names, values and children, independent of arena order
impl PartialEq for DataTree {
    fn eq(&self, other: &Self) -> bool {
        self.nodes[0].name == other.nodes[0].name && self.node_eq(self.root(), other, other.root())
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

/// Serde view of a subtree
///
/// Leaves serialize as their bare value, empty nodes as `{}` and inner nodes
/// as a map of children in name order. An inner node that also carries a
/// value becomes `{"value": .., "children": {..}}`, so no child name can
/// shadow the value.
pub struct TreeView<'a> {
    tree: &'a DataTree,
    id: NodeId,
}

/// Children of one node as a name-ordered map
struct ChildrenView<'a> {
    tree: &'a DataTree,
    id: NodeId,
}

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let children = &self.tree.nodes[self.id.0].children;
        let mut map = serializer.serialize_map(Some(children.len()))?;
        for (name, &child) in children {
            map.serialize_entry(name, &self.tree.view_at(child))?;
        }
        map.end()
    }
}

impl Serialize for TreeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = &self.tree.nodes[self.id.0];

        if node.children.is_empty() {
            return match &node.value {
                Some(value) => value.serialize(serializer),
                None => serializer.serialize_map(Some(0))?.end(),
            };
        }

        let children = ChildrenView {
            tree: self.tree,
            id: self.id,
        };
        match &node.value {
            Some(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("value", value)?;
                map.serialize_entry("children", &children)?;
                map.end()
            }
            None => children.serialize(serializer),
        }
    }
}
