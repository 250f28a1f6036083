//! Streaming reader for the particle binary format.
//!
//! Layout on disk (host-endian, densely packed):
//! - header: 4-byte magic, u16 version, u16 variant, u32-prefixed producer string
//! - blocks, each starting with a one-byte tag:
//!   - `p`: i32 event, i32 ensemble, u32 count, then `count × record_width` bytes
//!   - `f`: u32 event, u32 ensemble, f64 impact parameter, 1 reserved byte
//!   - `i`: reserved, zero-length
//!
//! After a `p` or `f` block the next byte must be a known tag (or the end of
//! the file), otherwise the block boundary is misaligned and the block is
//! rejected.

use super::blocks::{EndBlock, Header, ParticleBlock};
use super::layout::{FieldRegistry, Layout};
use crate::utils::config::{
    BLOCK_TAGS, END_BLOCK_SIZE, HEADER_FIXED_SIZE, PARTICLE_BLOCK_HEADER_SIZE, TAG_END_OF_EVENT,
    TAG_INFO, TAG_PARTICLES,
};
use crate::utils::error::DecodeError;
use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

/// Receiver of decoded blocks
///
/// Only `on_particle_block` is mandatory; header and end-of-event blocks are
/// ignored unless overridden.
pub trait BlockVisitor {
    fn on_header(&mut self, _header: &Header) -> Result<(), DecodeError> {
        Ok(())
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError>;

    fn on_end_block(&mut self, _block: &EndBlock) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Counters collected during one pass over a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub particle_blocks: u64,
    pub end_blocks: u64,
    pub info_blocks: u64,
    pub particles: u64,
    pub bytes_read: u64,
}

/// Decoder for one particle binary file
pub struct BinaryReader<R = BufReader<File>> {
    source: R,
    header: Header,
    layout: Layout,
    position: u64,
}

impl BinaryReader<BufReader<File>> {
    /// Open a file and read its header
    ///
    /// **Public** - main entry point for decoding
    ///
    /// The layout is projected before the file is touched, so a bad field
    /// request fails without any I/O.
    ///
    /// # Arguments
    /// * `path` - Binary particle file
    /// * `fields` - Field names in the order they appear in each record
    /// * `registry` - Field declarations
    ///
    /// # Errors
    /// * `DecodeError::Layout` - unknown or duplicate field
    /// * `DecodeError::Open` - file missing or unreadable
    /// * `DecodeError::TruncatedHeader` - file shorter than its header
    ///
    /// # Example
    /// ```ignore
    /// let registry = FieldRegistry::standard();
    /// let reader = BinaryReader::open("particles_binary.bin", &["p0", "pz", "pdg"], &registry)?;
    /// let summary = reader.run(&mut visitor)?;
    /// ```
    pub fn open<S: AsRef<str>>(
        path: impl AsRef<Path>,
        fields: &[S],
        registry: &FieldRegistry,
    ) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let layout = registry.project(fields)?;

        debug!(
            "Opening {} with {}-byte particle records",
            path.display(),
            layout.record_width()
        );

        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::with_layout(BufReader::new(file), layout)
    }
}

impl<R: BufRead> BinaryReader<R> {
    /// Decode from any buffered source (in-memory buffers, pipes)
    pub fn from_reader<S: AsRef<str>>(
        source: R,
        fields: &[S],
        registry: &FieldRegistry,
    ) -> Result<Self, DecodeError> {
        let layout = registry.project(fields)?;
        Self::with_layout(source, layout)
    }

    fn with_layout(source: R, layout: Layout) -> Result<Self, DecodeError> {
        let mut reader = Self {
            source,
            header: Header {
                magic: [0; 4],
                format_version: 0,
                format_variant: 0,
                producer_version: String::new(),
            },
            layout,
            position: 0,
        };
        reader.header = reader.read_header()?;

        debug!(
            "Header: magic {:?}, format {}.{}, producer {}",
            reader.header.magic_str(),
            reader.header.format_version,
            reader.header.format_variant,
            reader.header.producer_version
        );

        Ok(reader)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Stream every block of the file into `visitor`
    ///
    /// **Public** - consumes the reader; one pass per file
    ///
    /// # Returns
    /// Block and byte counters for the pass
    ///
    /// # Errors
    /// * `DecodeError::TruncatedRecord` - a block ends early; it is not delivered
    /// * `DecodeError::MalformedBlockTag` - unknown tag with data following it
    /// * any error returned by the visitor
    pub fn run<V: BlockVisitor + ?Sized>(mut self, visitor: &mut V) -> Result<ReadSummary, DecodeError> {
        visitor.on_header(&self.header)?;

        let mut summary = ReadSummary::default();

        while let Some(tag) = self.next_byte()? {
            match tag {
                TAG_PARTICLES => {
                    let block_start = self.position - 1;
                    let (event_number, ensemble_number, data) = self.read_particle_block()?;
                    self.expect_block_boundary()?;

                    let block = ParticleBlock::new(event_number, ensemble_number, data, &self.layout);
                    debug!(
                        "Particle block at byte {}: event {}, ensemble {}, {} particles",
                        block_start,
                        block.event_number,
                        block.ensemble_number,
                        block.npart()
                    );

                    summary.particle_blocks += 1;
                    summary.particles += block.npart() as u64;
                    visitor.on_particle_block(&block)?;
                }
                TAG_END_OF_EVENT => {
                    let block = self.read_end_block()?;
                    self.expect_block_boundary()?;

                    summary.end_blocks += 1;
                    visitor.on_end_block(&block)?;
                }
                TAG_INFO => {
                    summary.info_blocks += 1;
                }
                other => {
                    let offset = self.position - 1;
                    if self.peek_byte()?.is_some() {
                        return Err(DecodeError::MalformedBlockTag { tag: other, offset });
                    }
                    warn!(
                        "Ignoring unknown trailing byte 0x{:02x} at byte {}",
                        other, offset
                    );
                    break;
                }
            }
        }

        summary.bytes_read = self.position;
        debug!(
            "Finished reading: {} particle blocks, {} end blocks, {} particles",
            summary.particle_blocks, summary.end_blocks, summary.particles
        );

        Ok(summary)
    }

    fn read_header(&mut self) -> Result<Header, DecodeError> {
        let mut fixed = [0u8; HEADER_FIXED_SIZE];
        let found = self.read_fully(&mut fixed)?;
        if found < fixed.len() {
            return Err(DecodeError::TruncatedHeader(format!(
                "expected {} bytes, found {}",
                fixed.len(),
                found
            )));
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&fixed[0..4]);
        let format_version = u16::from_ne_bytes([fixed[4], fixed[5]]);
        let format_variant = u16::from_ne_bytes([fixed[6], fixed[7]]);
        let length = u32::from_ne_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]) as u64;

        let version_bytes = self.read_bounded(length)?;
        if (version_bytes.len() as u64) < length {
            return Err(DecodeError::TruncatedHeader(format!(
                "producer version declares {} bytes, found {}",
                length,
                version_bytes.len()
            )));
        }

        Ok(Header {
            magic,
            format_version,
            format_variant,
            producer_version: String::from_utf8_lossy(&version_bytes).into_owned(),
        })
    }

    fn read_particle_block(&mut self) -> Result<(i32, i32, Vec<u8>), DecodeError> {
        let mut fixed = [0u8; PARTICLE_BLOCK_HEADER_SIZE];
        self.read_record(&mut fixed, "particle block header")?;

        let event_number = i32::from_ne_bytes([fixed[0], fixed[1], fixed[2], fixed[3]]);
        let ensemble_number = i32::from_ne_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
        let npart = u32::from_ne_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]) as u64;

        let offset = self.position;
        let expected = npart * self.layout.record_width() as u64;
        let data = self.read_bounded(expected)?;
        if (data.len() as u64) < expected {
            return Err(DecodeError::TruncatedRecord {
                block: "particle data",
                offset,
                expected,
                found: data.len() as u64,
            });
        }

        Ok((event_number, ensemble_number, data))
    }

    fn read_end_block(&mut self) -> Result<EndBlock, DecodeError> {
        let mut raw = [0u8; END_BLOCK_SIZE];
        self.read_record(&mut raw, "end-of-event block")?;

        let mut impact = [0u8; 8];
        impact.copy_from_slice(&raw[8..16]);

        Ok(EndBlock {
            event_number: u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]),
            ensemble_number: u32::from_ne_bytes([raw[4], raw[5], raw[6], raw[7]]),
            impact_parameter: f64::from_ne_bytes(impact),
            reserved: raw[16],
        })
    }

    /// The byte after a block must start another block or end the file
    fn expect_block_boundary(&mut self) -> Result<(), DecodeError> {
        match self.peek_byte()? {
            None => Ok(()),
            Some(tag) if BLOCK_TAGS.contains(&tag) => Ok(()),
            Some(tag) => Err(DecodeError::MalformedBlockTag {
                tag,
                offset: self.position,
            }),
        }
    }

    fn read_record(&mut self, buf: &mut [u8], block: &'static str) -> Result<(), DecodeError> {
        let offset = self.position;
        let found = self.read_fully(buf)?;
        if found < buf.len() {
            return Err(DecodeError::TruncatedRecord {
                block,
                offset,
                expected: buf.len() as u64,
                found: found as u64,
            });
        }
        Ok(())
    }

    /// Read up to `length` bytes; the buffer grows with the bytes actually present
    fn read_bounded(&mut self, length: u64) -> Result<Vec<u8>, DecodeError> {
        let mut data = Vec::new();
        let found = self.source.by_ref().take(length).read_to_end(&mut data)?;
        self.position += found as u64;
        Ok(data)
    }

    /// Fill `buf` as far as the source allows, returning the byte count
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn next_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.source.consume(1);
            self.position += 1;
        }
        Ok(byte)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        loop {
            match self.source.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(producer: &str) -> Vec<u8> {
        let mut bytes = b"SMSH".to_vec();
        bytes.extend_from_slice(&7u16.to_ne_bytes());
        bytes.extend_from_slice(&1u16.to_ne_bytes());
        bytes.extend_from_slice(&(producer.len() as u32).to_ne_bytes());
        bytes.extend_from_slice(producer.as_bytes());
        bytes
    }

    struct Counter {
        particle_blocks: usize,
        end_blocks: usize,
    }

    impl BlockVisitor for Counter {
        fn on_particle_block(&mut self, _block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
            self.particle_blocks += 1;
            Ok(())
        }

        fn on_end_block(&mut self, _block: &EndBlock) -> Result<(), DecodeError> {
            self.end_blocks += 1;
            Ok(())
        }
    }

    #[test]
    fn test_header_only_file() {
        let registry = FieldRegistry::standard();
        let reader =
            BinaryReader::from_reader(Cursor::new(header_bytes("SMASH-3.1")), &["pdg"], &registry)
                .unwrap();

        assert_eq!(reader.header().producer_version, "SMASH-3.1");
        assert_eq!(reader.header().format_version, 7);

        let mut counter = Counter {
            particle_blocks: 0,
            end_blocks: 0,
        };
        let summary = reader.run(&mut counter).unwrap();
        assert_eq!(summary.particle_blocks, 0);
        assert_eq!(counter.end_blocks, 0);
    }

    #[test]
    fn test_truncated_header() {
        let registry = FieldRegistry::standard();
        let mut bytes = header_bytes("SMASH-3.1");
        bytes.truncate(bytes.len() - 2);

        let result = BinaryReader::from_reader(Cursor::new(bytes), &["pdg"], &registry);
        assert!(matches!(result, Err(DecodeError::TruncatedHeader(_))));
    }

    #[test]
    fn test_info_blocks_are_skipped() {
        let registry = FieldRegistry::standard();
        let mut bytes = header_bytes("v");
        bytes.extend_from_slice(b"ii");

        let reader = BinaryReader::from_reader(Cursor::new(bytes), &["pdg"], &registry).unwrap();
        let mut counter = Counter {
            particle_blocks: 0,
            end_blocks: 0,
        };
        let summary = reader.run(&mut counter).unwrap();
        assert_eq!(summary.info_blocks, 2);
    }

    #[test]
    fn test_unknown_tag_with_data_following() {
        let registry = FieldRegistry::standard();
        let mut bytes = header_bytes("v");
        bytes.extend_from_slice(b"xyz");

        let reader = BinaryReader::from_reader(Cursor::new(bytes), &["pdg"], &registry).unwrap();
        let mut counter = Counter {
            particle_blocks: 0,
            end_blocks: 0,
        };
        let err = reader.run(&mut counter).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedBlockTag { tag: b'x', .. }));
    }

    #[test]
    fn test_unknown_final_byte_ends_silently() {
        let registry = FieldRegistry::standard();
        let mut bytes = header_bytes("v");
        bytes.push(0);

        let reader = BinaryReader::from_reader(Cursor::new(bytes), &["pdg"], &registry).unwrap();
        let mut counter = Counter {
            particle_blocks: 0,
            end_blocks: 0,
        };
        assert!(reader.run(&mut counter).is_ok());
    }
}
