//! Binary particle file decoding.
//!
//! This module handles:
//! - Declaring the known particle fields and projecting per-run layouts
//! - Reading the file header and streaming tagged blocks
//! - Typed per-particle field access
//! - Writing synthetic files in the same format

pub mod blocks;
pub mod layout;
pub mod reader;
pub mod writer;

// Re-export main types
pub use blocks::{EndBlock, Header, ParticleBlock};
pub use layout::{FieldKind, FieldRegistry, FieldSlot, FieldSpec, Layout};
pub use reader::{BinaryReader, BlockVisitor, ReadSummary};
pub use writer::{BinaryWriter, FieldValue};
