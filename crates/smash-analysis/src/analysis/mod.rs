//! Per-file analyses over decoded particle blocks.
//!
//! This module handles:
//! - The analysis contract (`Analysis`)
//! - Name-keyed construction of analyses (`AnalysisRegistry`)
//! - Fan-out of decoded blocks to every active analysis (`Dispatcher`)
//! - The built-in analyses

pub mod dispatcher;
pub mod midrapidity;
pub mod registry;
pub mod simple;
pub mod wounded;

use crate::aggregator::DataTree;
use crate::parser::{EndBlock, Header, ParticleBlock};
use crate::utils::error::DecodeError;

// Re-export main types
pub use dispatcher::Dispatcher;
pub use registry::{AnalysisEntry, AnalysisRegistry, PostMergeFn};

/// One analysis instance, living for the duration of one file
///
/// The decoder drives `on_header`, then `on_particle_block` and
/// `on_end_block` in file order. `finalize` runs once after the last block,
/// and `save` hands the accumulated tree over for combination.
pub trait Analysis {
    /// Registry name; also the node the results are stored under
    fn name(&self) -> &str;

    fn on_header(&mut self, _header: &Header) -> Result<(), DecodeError> {
        Ok(())
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError>;

    fn on_end_block(&mut self, _block: &EndBlock) -> Result<(), DecodeError> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    fn save(self: Box<Self>) -> DataTree;
}

/// Rapidity `0.5 ln((E + pz) / (E - pz))`, or `None` unless `E > |pz|`
pub fn rapidity(energy: f64, pz: f64) -> Option<f64> {
    if !(energy.is_finite() && pz.is_finite() && energy > pz.abs()) {
        return None;
    }
    let y = 0.5 * ((energy + pz) / (energy - pz)).ln();
    y.is_finite().then_some(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rapidity() {
        assert_eq!(rapidity(2.0, 0.0), Some(0.0));
        assert!(rapidity(1.0, 1.0).is_none());
        assert!(rapidity(1.0, -2.0).is_none());
        assert!(rapidity(f64::NAN, 0.0).is_none());

        let y = rapidity(5.0, 3.0).unwrap();
        assert!((y - 0.5 * 4.0f64.ln()).abs() < 1e-12);
    }
}
