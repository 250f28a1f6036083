//! Writer for the particle binary format.
//!
//! Produces files the reader accepts: used to build synthetic inputs with
//! known contents.

use super::blocks::{EndBlock, Header};
use super::layout::{FieldKind, FieldRegistry, Layout};
use crate::utils::config::{TAG_END_OF_EVENT, TAG_INFO, TAG_PARTICLES};
use crate::utils::error::DecodeError;
use std::io::{self, Write};

/// One field value of a particle record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Int(i32),
}

impl FieldValue {
    fn kind(self) -> FieldKind {
        match self {
            FieldValue::Float(_) => FieldKind::Float64,
            FieldValue::Int(_) => FieldKind::Int32,
        }
    }
}

/// Encoder for one particle binary stream
pub struct BinaryWriter<W: Write> {
    sink: W,
    layout: Layout,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a writer whose particle records follow `fields`
    pub fn new<S: AsRef<str>>(sink: W, fields: &[S], registry: &FieldRegistry) -> Result<Self, DecodeError> {
        Ok(Self {
            sink,
            layout: registry.project(fields)?,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn write_header(&mut self, header: &Header) -> io::Result<()> {
        self.sink.write_all(&header.magic)?;
        self.sink.write_all(&header.format_version.to_ne_bytes())?;
        self.sink.write_all(&header.format_variant.to_ne_bytes())?;
        let producer = header.producer_version.as_bytes();
        self.sink.write_all(&(producer.len() as u32).to_ne_bytes())?;
        self.sink.write_all(producer)
    }

    /// Write a `p` block; each particle lists its values in layout order
    ///
    /// # Errors
    /// * `DecodeError::FieldKindMismatch` - a value does not match its field's kind
    /// * `DecodeError::Io` - wrong number of values, or the sink failed
    pub fn write_particle_block(
        &mut self,
        event_number: i32,
        ensemble_number: i32,
        particles: &[Vec<FieldValue>],
    ) -> Result<(), DecodeError> {
        let mut data = Vec::with_capacity(particles.len() * self.layout.record_width());

        for values in particles {
            if values.len() != self.layout.fields().len() {
                return Err(DecodeError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "particle has {} values, layout has {} fields",
                        values.len(),
                        self.layout.fields().len()
                    ),
                )));
            }

            for (field, value) in self.layout.fields().iter().zip(values) {
                if field.slot.kind != value.kind() {
                    return Err(DecodeError::FieldKindMismatch {
                        field: field.name.clone(),
                        requested: value.kind().label(),
                        actual: field.slot.kind.label(),
                    });
                }
                match value {
                    FieldValue::Float(v) => data.extend_from_slice(&v.to_ne_bytes()),
                    FieldValue::Int(v) => data.extend_from_slice(&v.to_ne_bytes()),
                }
            }
        }

        self.sink.write_all(&[TAG_PARTICLES])?;
        self.sink.write_all(&event_number.to_ne_bytes())?;
        self.sink.write_all(&ensemble_number.to_ne_bytes())?;
        self.sink.write_all(&(particles.len() as u32).to_ne_bytes())?;
        self.sink.write_all(&data)?;
        Ok(())
    }

    pub fn write_end_block(&mut self, block: &EndBlock) -> io::Result<()> {
        self.sink.write_all(&[TAG_END_OF_EVENT])?;
        self.sink.write_all(&block.event_number.to_ne_bytes())?;
        self.sink.write_all(&block.ensemble_number.to_ne_bytes())?;
        self.sink.write_all(&block.impact_parameter.to_ne_bytes())?;
        self.sink.write_all(&[block.reserved])
    }

    pub fn write_info_block(&mut self) -> io::Result<()> {
        self.sink.write_all(&[TAG_INFO])
    }

    /// Append arbitrary bytes (for corrupted-stream fixtures)
    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes)
    }

    /// Flush and return the underlying sink
    pub fn into_inner(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
