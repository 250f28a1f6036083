//! `simple`: rapidity spectrum of all particles.

use super::registry::AnalysisEntry;
use super::{rapidity, Analysis};
use crate::aggregator::{DataTree, Histogram, NodeId, Value};
use crate::parser::{EndBlock, ParticleBlock};
use crate::utils::error::{AggregateError, DecodeError};

pub const NAME: &str = "simple";

const Y_MIN: f64 = -5.0;
const Y_MAX: f64 = 5.0;
const Y_BINS: usize = 100;

pub fn entry() -> AnalysisEntry {
    AnalysisEntry::new(
        NAME,
        "rapidity histogram of all particles, dN/dy after merging",
        &["p0", "pz"],
        || Box::new(SimpleRapidity::new()),
    )
    .with_post_merge(derive_dndy)
}

pub struct SimpleRapidity {
    tree: DataTree,
    hist: NodeId,
    n_events: NodeId,
}

impl SimpleRapidity {
    pub fn new() -> Self {
        let mut tree = DataTree::new();
        let root = tree.root();
        let hist = tree.child(root, "rapidity");
        let n_events = tree.child(root, "n_events");
        Self {
            tree,
            hist,
            n_events,
        }
    }
}

impl Default for SimpleRapidity {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis for SimpleRapidity {
    fn name(&self) -> &str {
        NAME
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
        let energy = block.float_slot("p0")?;
        let pz = block.float_slot("pz")?;

        let hist = self
            .tree
            .histogram_or_insert_with(self.hist, || Histogram::new(Y_MIN, Y_MAX, Y_BINS))?;

        for i in 0..block.npart() {
            if let Some(y) = rapidity(block.float_at(energy, i)?, block.float_at(pz, i)?) {
                hist.fill(y);
            }
        }
        Ok(())
    }

    fn on_end_block(&mut self, _block: &EndBlock) -> Result<(), DecodeError> {
        self.tree.add_int(self.n_events, 1)?;
        Ok(())
    }

    fn save(self: Box<Self>) -> DataTree {
        self.tree
    }
}

/// Derive `dndy` and `dndy_error` from the merged histogram and event count
///
/// Bins are divided by bin width and event count; errors are
/// `sqrt(raw) / (width × n_events)` taken on the raw counts. Without events
/// both sequences are zero.
fn derive_dndy(tree: &mut DataTree, node: NodeId) -> Result<(), AggregateError> {
    let Some(hist) = tree
        .find(node, "rapidity")
        .and_then(|id| tree.histogram(id))
        .cloned()
    else {
        return Ok(());
    };
    let n_events = tree
        .find(node, "n_events")
        .and_then(|id| tree.int(id))
        .unwrap_or(0)
        .max(0) as u64;

    let norm = hist.bin_width() * n_events as f64;
    let dndy: Vec<f64> = hist
        .counts()
        .iter()
        .map(|count| if n_events == 0 { 0.0 } else { count / norm })
        .collect();
    let errors: Vec<f64> = (0..hist.num_bins())
        .map(|i| hist.normalized_error(i, n_events).unwrap_or(0.0))
        .collect();

    let dndy_node = tree.child(node, "dndy");
    tree.set_value(dndy_node, Value::FloatSeq(dndy));
    let error_node = tree.child(node, "dndy_error");
    tree.set_value(error_node, Value::FloatSeq(errors));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dndy_from_merged_counts() {
        let mut tree = DataTree::new();
        let root = tree.root();
        let node = tree.child(root, NAME);

        let hist_node = tree.child(node, "rapidity");
        let hist = tree
            .histogram_or_insert_with(hist_node, || Histogram::new(Y_MIN, Y_MAX, Y_BINS))
            .unwrap();
        for _ in 0..4 {
            hist.fill(0.05);
        }
        let n_events = tree.child(node, "n_events");
        tree.set_value(n_events, 2i64);

        derive_dndy(&mut tree, node).unwrap();

        // bin 50 covers [0.0, 0.1): 4 / (0.1 * 2) and sqrt(4) / (0.1 * 2)
        let dndy = tree.find(node, "dndy").and_then(|id| tree.value(id)).unwrap();
        let errors = tree.find(node, "dndy_error").and_then(|id| tree.value(id)).unwrap();
        match (dndy, errors) {
            (Value::FloatSeq(dndy), Value::FloatSeq(errors)) => {
                assert_eq!(dndy.len(), Y_BINS);
                assert!((dndy[50] - 20.0).abs() < 1e-9);
                assert!((errors[50] - 10.0).abs() < 1e-9);
                assert_eq!(dndy[49], 0.0);
            }
            other => panic!("unexpected values {:?}", other),
        }
    }

    #[test]
    fn test_dndy_without_events_is_zero() {
        let mut tree = DataTree::new();
        let root = tree.root();
        let hist_node = tree.child(root, "rapidity");
        tree.histogram_or_insert_with(hist_node, || Histogram::new(Y_MIN, Y_MAX, Y_BINS))
            .unwrap()
            .fill(0.0);

        derive_dndy(&mut tree, root).unwrap();
        let dndy = tree.find(root, "dndy").and_then(|id| tree.value(id)).unwrap();
        assert_eq!(dndy, &Value::FloatSeq(vec![0.0; Y_BINS]));
    }
}
