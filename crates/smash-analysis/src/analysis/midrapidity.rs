//! `midrapidity_counts`: per-species yields at |y| < 0.5.

use super::registry::AnalysisEntry;
use super::{rapidity, Analysis};
use crate::aggregator::{DataTree, NodeId};
use crate::parser::ParticleBlock;
use crate::utils::error::DecodeError;
use std::collections::BTreeMap;

pub const NAME: &str = "midrapidity_counts";

const Y_WINDOW: f64 = 0.5;

pub fn entry() -> AnalysisEntry {
    AnalysisEntry::new(
        NAME,
        "particle counts per PDG code with |y| < 0.5",
        &["p0", "pz", "pdg"],
        || Box::new(MidrapidityCounts::new()),
    )
}

pub struct MidrapidityCounts {
    tree: DataTree,
    counts: NodeId,
    by_pdg: BTreeMap<i32, NodeId>,
}

impl MidrapidityCounts {
    pub fn new() -> Self {
        let mut tree = DataTree::new();
        let root = tree.root();
        let counts = tree.child(root, "counts");
        Self {
            tree,
            counts,
            by_pdg: BTreeMap::new(),
        }
    }

    fn node_for(&mut self, pdg: i32) -> NodeId {
        let Self {
            tree,
            counts,
            by_pdg,
        } = self;
        *by_pdg
            .entry(pdg)
            .or_insert_with(|| tree.child(*counts, &pdg.to_string()))
    }
}

impl Default for MidrapidityCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis for MidrapidityCounts {
    fn name(&self) -> &str {
        NAME
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
        let energy = block.float_slot("p0")?;
        let pz = block.float_slot("pz")?;
        let pdg = block.int_slot("pdg")?;

        for i in 0..block.npart() {
            let Some(y) = rapidity(block.float_at(energy, i)?, block.float_at(pz, i)?) else {
                continue;
            };
            if y.abs() < Y_WINDOW {
                let node = self.node_for(block.int_at(pdg, i)?);
                self.tree.add_int(node, 1)?;
            }
        }
        Ok(())
    }

    fn save(self: Box<Self>) -> DataTree {
        self.tree
    }
}
