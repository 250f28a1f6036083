//! Decoded blocks of the particle binary format.
//!
//! Blocks are transient: the reader builds one, hands it to the visitor and
//! drops it. Particle data stays in one flat buffer; per-particle records are
//! fixed-width slices of it.

use super::layout::{FieldKind, FieldSlot, Layout};
use crate::utils::error::DecodeError;
use serde::Serialize;
use std::fmt;

/// File header, read once per file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Four-byte magic tag (not validated)
    pub magic: [u8; 4],

    pub format_version: u16,

    pub format_variant: u16,

    /// Version string of the program that wrote the file
    pub producer_version: String,
}

impl Header {
    /// Magic tag as text (lossy for non-UTF-8 bytes)
    pub fn magic_str(&self) -> String {
        String::from_utf8_lossy(&self.magic).into_owned()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Magic Number:     {}", self.magic_str())?;
        writeln!(f, "Format Version:   {}", self.format_version)?;
        writeln!(f, "Format Variant:   {}", self.format_variant)?;
        write!(f, "Producer Version: {}", self.producer_version)
    }
}

/// End-of-event summary block
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EndBlock {
    pub event_number: u32,
    pub ensemble_number: u32,
    pub impact_parameter: f64,
    /// Reserved trailing byte
    pub reserved: u8,
}

/// One event's particle records
#[derive(Debug, Clone)]
pub struct ParticleBlock<'a> {
    pub event_number: i32,
    pub ensemble_number: i32,
    data: Vec<u8>,
    layout: &'a Layout,
}

impl<'a> ParticleBlock<'a> {
    /// Build a block from a flat record buffer
    ///
    /// `data.len()` must be a multiple of the layout's record width.
    pub(crate) fn new(event_number: i32, ensemble_number: i32, data: Vec<u8>, layout: &'a Layout) -> Self {
        Self {
            event_number,
            ensemble_number,
            data,
            layout,
        }
    }

    /// Number of particles in the block
    pub fn npart(&self) -> usize {
        match self.layout.record_width() {
            0 => 0,
            width => self.data.len() / width,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.npart() == 0
    }

    /// Layout the records were decoded with
    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    /// Raw bytes of one particle record
    pub fn record(&self, index: usize) -> Option<&[u8]> {
        let width = self.layout.record_width();
        let start = index.checked_mul(width)?;
        let end = start.checked_add(width)?;
        self.data.get(start..end).filter(|_| width > 0)
    }

    /// Iterate over raw particle records
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.layout.record_width().max(1))
    }

    /// Resolve a field name to its slot in this block's layout
    ///
    /// # Errors
    /// * `DecodeError::FieldNotProjected` - field was not requested at open time
    pub fn slot(&self, name: &str) -> Result<FieldSlot, DecodeError> {
        self.layout
            .find(name)
            .ok_or_else(|| DecodeError::FieldNotProjected(name.to_string()))
    }

    /// Slot of an integer field, for use with `int_at` in per-particle loops
    pub fn int_slot(&self, name: &str) -> Result<FieldSlot, DecodeError> {
        let slot = self.slot(name)?;
        check_kind(name, slot, FieldKind::Int32)?;
        Ok(slot)
    }

    /// Slot of a floating-point field, for use with `float_at`
    pub fn float_slot(&self, name: &str) -> Result<FieldSlot, DecodeError> {
        let slot = self.slot(name)?;
        check_kind(name, slot, FieldKind::Float64)?;
        Ok(slot)
    }

    /// Integer field of one particle, looked up by name
    pub fn get_int(&self, name: &str, index: usize) -> Result<i32, DecodeError> {
        let slot = self.slot(name)?;
        check_kind(name, slot, FieldKind::Int32)?;
        self.int_at(slot, index)
    }

    /// Floating-point field of one particle, looked up by name
    pub fn get_float(&self, name: &str, index: usize) -> Result<f64, DecodeError> {
        let slot = self.slot(name)?;
        check_kind(name, slot, FieldKind::Float64)?;
        self.float_at(slot, index)
    }

    /// Integer field through a pre-resolved slot
    pub fn int_at(&self, slot: FieldSlot, index: usize) -> Result<i32, DecodeError> {
        let bytes = self.field_bytes::<4>(slot, index)?;
        Ok(i32::from_ne_bytes(bytes))
    }

    /// Floating-point field through a pre-resolved slot
    pub fn float_at(&self, slot: FieldSlot, index: usize) -> Result<f64, DecodeError> {
        let bytes = self.field_bytes::<8>(slot, index)?;
        Ok(f64::from_ne_bytes(bytes))
    }

    fn field_bytes<const N: usize>(&self, slot: FieldSlot, index: usize) -> Result<[u8; N], DecodeError> {
        let npart = self.npart();
        let record = self
            .record(index)
            .ok_or(DecodeError::ParticleIndexOutOfRange { index, npart })?;

        record
            .get(slot.offset..slot.offset + N)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(DecodeError::ParticleIndexOutOfRange { index, npart })
    }
}

fn check_kind(name: &str, slot: FieldSlot, requested: FieldKind) -> Result<(), DecodeError> {
    if slot.kind == requested {
        Ok(())
    } else {
        Err(DecodeError::FieldKindMismatch {
            field: name.to_string(),
            requested: requested.label(),
            actual: slot.kind.label(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::layout::FieldRegistry;

    fn block_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        for (p0, pdg) in [(1.5f64, 211i32), (2.5, -211)] {
            data.extend_from_slice(&p0.to_ne_bytes());
            data.extend_from_slice(&pdg.to_ne_bytes());
        }
        data
    }

    #[test]
    fn test_typed_access() {
        let layout = FieldRegistry::standard().project(&["p0", "pdg"]).unwrap();
        let block = ParticleBlock::new(3, 0, block_bytes(), &layout);

        assert_eq!(block.npart(), 2);
        assert_eq!(block.get_float("p0", 1).unwrap(), 2.5);
        assert_eq!(block.get_int("pdg", 0).unwrap(), 211);
        assert_eq!(block.get_int("particle-type-code", 1).unwrap(), -211);
        assert_eq!(block.records().count(), 2);
    }

    #[test]
    fn test_access_errors() {
        let layout = FieldRegistry::standard().project(&["p0", "pdg"]).unwrap();
        let block = ParticleBlock::new(0, 0, block_bytes(), &layout);

        assert!(matches!(
            block.get_float("pz", 0),
            Err(DecodeError::FieldNotProjected(name)) if name == "pz"
        ));
        assert!(matches!(
            block.get_int("p0", 0),
            Err(DecodeError::FieldKindMismatch { .. })
        ));
        assert!(matches!(
            block.get_float("p0", 2),
            Err(DecodeError::ParticleIndexOutOfRange { index: 2, npart: 2 })
        ));
    }
}
