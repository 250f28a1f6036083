use pretty_assertions::assert_eq;
use smash_analysis::parser::{
    BinaryReader, BinaryWriter, BlockVisitor, EndBlock, FieldRegistry, FieldValue, Header,
    ParticleBlock,
};
use smash_analysis::utils::error::{DecodeError, LayoutError};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

/// Particle values copied out of each delivered block
#[derive(Debug, Default)]
struct Collector {
    header: Option<Header>,
    particles: Vec<(i32, Vec<(f64, f64, i32)>)>,
    ends: Vec<EndBlock>,
}

impl BlockVisitor for Collector {
    fn on_header(&mut self, header: &Header) -> Result<(), DecodeError> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
        let mut rows = Vec::new();
        for i in 0..block.npart() {
            rows.push((
                block.get_float("p0", i)?,
                block.get_float("pz", i)?,
                block.get_int("pdg", i)?,
            ));
        }
        self.particles.push((block.event_number, rows));
        Ok(())
    }

    fn on_end_block(&mut self, block: &EndBlock) -> Result<(), DecodeError> {
        self.ends.push(*block);
        Ok(())
    }
}

const FIELDS: &[&str] = &["p0", "pz", "pdg"];

fn header() -> Header {
    Header {
        magic: *b"SIMH",
        format_version: 1,
        format_variant: 0,
        producer_version: "v1.0".to_string(),
    }
}

fn writer() -> BinaryWriter<Vec<u8>> {
    let mut writer = BinaryWriter::new(Vec::new(), FIELDS, &FieldRegistry::standard()).unwrap();
    writer.write_header(&header()).unwrap();
    writer
}

fn decode(bytes: Vec<u8>, collector: &mut Collector) -> Result<u64, DecodeError> {
    let reader = BinaryReader::from_reader(Cursor::new(bytes), FIELDS, &FieldRegistry::standard())?;
    reader.run(collector).map(|summary| summary.particle_blocks)
}

#[test]
fn test_particle_then_end_block_from_file() {
    let mut w = writer();
    w.write_particle_block(
        0,
        0,
        &[
            vec![FieldValue::Float(1.5), FieldValue::Float(0.5), FieldValue::Int(211)],
            vec![FieldValue::Float(2.0), FieldValue::Float(-1.0), FieldValue::Int(2112)],
        ],
    )
    .unwrap();
    w.write_end_block(&EndBlock {
        event_number: 0,
        ensemble_number: 0,
        impact_parameter: 3.25,
        reserved: 0,
    })
    .unwrap();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&w.into_inner().unwrap()).unwrap();
    file.flush().unwrap();

    let reader = BinaryReader::open(file.path(), FIELDS, &FieldRegistry::standard()).unwrap();
    assert_eq!(reader.layout().record_width(), 20);

    let mut collector = Collector::default();
    let summary = reader.run(&mut collector).unwrap();

    assert_eq!(collector.header, Some(header()));
    assert_eq!(
        collector.particles,
        vec![(0, vec![(1.5, 0.5, 211), (2.0, -1.0, 2112)])]
    );
    assert_eq!(collector.ends.len(), 1);
    assert_eq!(collector.ends[0].impact_parameter, 3.25);
    assert_eq!(summary.particles, 2);
    assert_eq!(summary.end_blocks, 1);
}

#[test]
fn test_unknown_field_fails_before_io() {
    let result = BinaryReader::open(
        "/nonexistent/particles_binary.bin",
        &["p0", "unknown_field"],
        &FieldRegistry::standard(),
    );

    match result {
        Err(DecodeError::Layout(LayoutError::UnknownField(name))) => assert_eq!(name, "unknown_field"),
        Err(other) => panic!("expected UnknownField, got {other}"),
        Ok(_) => panic!("expected UnknownField"),
    }
}

#[test]
fn test_missing_file_is_open_error() {
    let result = BinaryReader::open("/nonexistent/particles_binary.bin", FIELDS, &FieldRegistry::standard());
    assert!(matches!(result, Err(DecodeError::Open { .. })));
}

#[test]
fn test_short_header_is_truncated() {
    let mut collector = Collector::default();
    let result = decode(b"SIMH\x01\x00".to_vec(), &mut collector);
    assert!(matches!(result, Err(DecodeError::TruncatedHeader(_))));
}

#[test]
fn test_overrunning_particle_count_is_truncated() {
    let mut w = writer();
    w.write_particle_block(
        0,
        0,
        &[vec![FieldValue::Float(1.0), FieldValue::Float(0.0), FieldValue::Int(211)]],
    )
    .unwrap();

    // Second block declares 5 particles but carries one record
    w.write_raw(b"p").unwrap();
    w.write_raw(&1i32.to_ne_bytes()).unwrap();
    w.write_raw(&0i32.to_ne_bytes()).unwrap();
    w.write_raw(&5u32.to_ne_bytes()).unwrap();
    w.write_raw(&[0u8; 20]).unwrap();

    let mut collector = Collector::default();
    let result = decode(w.into_inner().unwrap(), &mut collector);

    assert!(matches!(result, Err(DecodeError::TruncatedRecord { expected: 100, found: 20, .. })));
    assert_eq!(collector.particles.len(), 1);
    assert_eq!(collector.particles[0].0, 0);
}

#[test]
fn test_invalid_tag_after_block_is_rejected() {
    let mut w = writer();
    w.write_particle_block(
        0,
        0,
        &[vec![FieldValue::Float(1.0), FieldValue::Float(0.0), FieldValue::Int(211)]],
    )
    .unwrap();
    w.write_raw(b"zzz").unwrap();

    let mut collector = Collector::default();
    let result = decode(w.into_inner().unwrap(), &mut collector);

    assert!(matches!(result, Err(DecodeError::MalformedBlockTag { tag: b'z', .. })));
    assert!(collector.particles.is_empty());
}

#[test]
fn test_unknown_final_byte_ends_stream() {
    let mut w = writer();
    w.write_info_block().unwrap();
    w.write_raw(b"z").unwrap();

    let mut collector = Collector::default();
    assert_eq!(decode(w.into_inner().unwrap(), &mut collector).unwrap(), 0);
}

#[test]
fn test_round_trip_typed_access() {
    let registry = FieldRegistry::standard();
    let fields = ["t", "p0", "px", "py", "pz", "pdg", "id", "charge", "ncoll"];
    let mut w = BinaryWriter::new(Vec::new(), &fields, &registry).unwrap();
    w.write_header(&header()).unwrap();

    let mut particles = Vec::new();
    for i in 0..4 {
        particles.push(vec![
            FieldValue::Float(0.1 * i as f64),
            FieldValue::Float(1.0 + i as f64),
            FieldValue::Float(-0.25),
            FieldValue::Float(0.75),
            FieldValue::Float(0.5 * i as f64),
            FieldValue::Int(if i % 2 == 0 { 2212 } else { -211 }),
            FieldValue::Int(i),
            FieldValue::Int(1 - i % 2 * 2),
            FieldValue::Int(i * 3),
        ]);
    }
    w.write_particle_block(7, 2, &particles).unwrap();

    struct Check;
    impl BlockVisitor for Check {
        fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
            assert_eq!(block.event_number, 7);
            assert_eq!(block.ensemble_number, 2);
            assert_eq!(block.npart(), 4);
            for i in 0..4 {
                assert_eq!(block.get_float("p0", i)?, 1.0 + i as f64);
                assert_eq!(block.get_float("pz", i)?, 0.5 * i as f64);
                assert_eq!(block.get_int("id", i)?, i as i32);
                assert_eq!(block.get_int("ncoll", i)?, 3 * i as i32);
            }
            assert!(matches!(block.get_float("mass", 0), Err(DecodeError::FieldNotProjected(_))));
            assert!(matches!(block.get_float("pdg", 0), Err(DecodeError::FieldKindMismatch { .. })));
            assert!(matches!(
                block.get_int("pdg", 4),
                Err(DecodeError::ParticleIndexOutOfRange { index: 4, npart: 4 })
            ));
            Ok(())
        }
    }

    let reader = BinaryReader::from_reader(Cursor::new(w.into_inner().unwrap()), &fields, &registry).unwrap();
    let summary = reader.run(&mut Check).unwrap();
    assert_eq!(summary.particles, 4);
}

#[test]
fn test_layout_is_ordered_and_additive() {
    let registry = FieldRegistry::standard();
    let layout = registry.project(&["pdg", "p0", "ncoll", "pz"]).unwrap();

    let offsets: Vec<(&str, usize)> = layout
        .fields()
        .iter()
        .map(|field| (field.name.as_str(), field.slot.offset))
        .collect();
    assert_eq!(offsets, vec![("pdg", 0), ("p0", 4), ("ncoll", 12), ("pz", 16)]);
    assert_eq!(layout.record_width(), 24);

    assert!(matches!(
        registry.project(&["p0", "p0"]),
        Err(LayoutError::DuplicateField(_))
    ));
}
