//! `wounded_rapidity`: identified-particle spectra in classes of wounded nucleons.
//!
//! Each particle block is one event. Its wounded-nucleon count (protons and
//! neutrons with at least one collision) selects a class node
//! `wounded/wSSS-EEE`; inside it every selected species gets a rapidity
//! histogram and a mid-rapidity transverse-momentum histogram, and the class
//! counts its events.

use super::registry::AnalysisEntry;
use super::{rapidity, Analysis};
use crate::aggregator::{DataTree, Histogram, NodeId};
use crate::parser::ParticleBlock;
use crate::utils::error::{AggregateError, DecodeError};
use log::debug;

pub const NAME: &str = "wounded_rapidity";

const Y_MIN: f64 = -4.0;
const Y_MAX: f64 = 4.0;
const Y_BINS: usize = 30;

const PT_MIN: f64 = 0.0;
const PT_MAX: f64 = 3.0;
const PT_BINS: usize = 30;

const MIDRAPIDITY: f64 = 0.5;

const WOUNDED_BIN_WIDTH: i32 = 10;
const WOUNDED_MIN: i32 = 0;
const WOUNDED_MAX: i32 = 416;

const PROTON: i32 = 2212;
const NEUTRON: i32 = 2112;

/// Species with spectra; all but the self-conjugate neutral mesons also
/// count with their antiparticle
const SPECIES: &[i32] = &[
    111, 211, 311, 321, 310, 130, 3122, 3222, 3212, 3112, 3322, 3312, 3334, 2212,
];
const SELF_CONJUGATE: &[i32] = &[111, 310, 130];

pub fn entry() -> AnalysisEntry {
    AnalysisEntry::new(
        NAME,
        "rapidity and mid-rapidity pT spectra per species, in wounded-nucleon classes",
        &["p0", "px", "py", "pz", "pdg", "ncoll"],
        || Box::new(WoundedRapidity::new()),
    )
    .with_post_merge(write_binning)
}

fn is_selected(pdg: i32) -> bool {
    SPECIES.contains(&pdg) || (SPECIES.contains(&-pdg) && !SELF_CONJUGATE.contains(&-pdg))
}

/// Class label for a wounded count, e.g. `w120-129`; counts are clamped to the class range
pub fn class_label(wounded: i32) -> String {
    let clamped = wounded.clamp(WOUNDED_MIN, WOUNDED_MAX);
    let start = WOUNDED_MIN + (clamped - WOUNDED_MIN) / WOUNDED_BIN_WIDTH * WOUNDED_BIN_WIDTH;
    let end = (start + WOUNDED_BIN_WIDTH - 1).min(WOUNDED_MAX);
    format!("w{:03}-{:03}", start, end)
}

pub struct WoundedRapidity {
    tree: DataTree,
    classes: NodeId,
    skipped_events: i64,
}

impl WoundedRapidity {
    pub fn new() -> Self {
        let mut tree = DataTree::new();
        let root = tree.root();
        let classes = tree.child(root, "wounded");
        Self {
            tree,
            classes,
            skipped_events: 0,
        }
    }
}

impl Default for WoundedRapidity {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis for WoundedRapidity {
    fn name(&self) -> &str {
        NAME
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
        let pdg = block.int_slot("pdg")?;
        let ncoll = block.int_slot("ncoll")?;
        let energy = block.float_slot("p0")?;
        let px = block.float_slot("px")?;
        let py = block.float_slot("py")?;
        let pz = block.float_slot("pz")?;

        let mut wounded = 0;
        for i in 0..block.npart() {
            let code = block.int_at(pdg, i)?;
            if (code == PROTON || code == NEUTRON) && block.int_at(ncoll, i)? > 0 {
                wounded += 1;
            }
        }
        if wounded == 0 {
            self.skipped_events += 1;
            return Ok(());
        }

        let class = self.tree.child(self.classes, &class_label(wounded));

        for i in 0..block.npart() {
            let code = block.int_at(pdg, i)?;
            if !is_selected(code) {
                continue;
            }

            let y = rapidity(block.float_at(energy, i)?, block.float_at(pz, i)?);
            if let Some(y) = y.filter(|y| (Y_MIN..Y_MAX).contains(y)) {
                let node = self.tree.child(class, &format!("rapidity_pdg_{}", code));
                self.tree
                    .histogram_or_insert_with(node, || Histogram::new(Y_MIN, Y_MAX, Y_BINS))?
                    .fill(y);
            }

            let pt = block.float_at(px, i)?.hypot(block.float_at(py, i)?);
            let midrapidity = y.is_some_and(|y| y.abs() < MIDRAPIDITY);
            if midrapidity && (PT_MIN..PT_MAX).contains(&pt) {
                let node = self.tree.child(class, &format!("p_perp_pdg_{}", code));
                self.tree
                    .histogram_or_insert_with(node, || Histogram::new(PT_MIN, PT_MAX, PT_BINS))?
                    .fill(pt);
            }
        }

        let n_events = self.tree.child(class, "n_events");
        self.tree.add_int(n_events, 1)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), DecodeError> {
        if self.skipped_events > 0 {
            debug!("{} events without wounded nucleons", self.skipped_events);
        }
        let root = self.tree.root();
        let node = self.tree.path(root, "meta/events_without_wounded");
        self.tree.add_int(node, self.skipped_events)?;
        Ok(())
    }

    fn save(self: Box<Self>) -> DataTree {
        self.tree
    }
}

/// Record the histogram geometry under `meta/histogram_binning`
///
/// Written once on the combined tree, since float leaves add up when merged.
fn write_binning(tree: &mut DataTree, node: NodeId) -> Result<(), AggregateError> {
    let binning = tree.path(node, "meta/histogram_binning");

    for (name, min, max, bins) in [
        ("rapidity", Y_MIN, Y_MAX, Y_BINS),
        ("p_perp", PT_MIN, PT_MAX, PT_BINS),
    ] {
        let hist = tree.child(binning, name);
        let min_node = tree.child(hist, "min");
        tree.set_value(min_node, min);
        let max_node = tree.child(hist, "max");
        tree.set_value(max_node, max);
        let width_node = tree.child(hist, "bin_width");
        tree.set_value(width_node, (max - min) / bins.max(1) as f64);
    }
    Ok(())
}
