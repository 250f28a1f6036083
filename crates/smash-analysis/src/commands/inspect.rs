//! Inspect command implementation.
//!
//! Prints the header of one binary file and a per-block listing, without
//! running any analysis.

use super::models::InspectArgs;
use crate::parser::{
    BinaryReader, BlockVisitor, EndBlock, FieldKind, FieldRegistry, ParticleBlock, ReadSummary,
};
use crate::utils::config::DEFAULT_FIELDS;
use crate::utils::error::DecodeError;
use anyhow::{Context, Result};
use colored::*;

/// Execute the inspect command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Layout errors (unknown or duplicate field)
/// * Decode errors; blocks listed before the failure are still printed
pub fn execute_inspect(args: InspectArgs) -> Result<()> {
    let fields = args
        .fields
        .clone()
        .unwrap_or_else(|| DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect());

    let registry = FieldRegistry::standard();
    let reader = BinaryReader::open(&args.input, &fields, &registry)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    println!("{}", args.input.display().to_string().bold());
    println!("{}", reader.header());
    println!("Record Width:     {} bytes", reader.layout().record_width());
    println!();

    let mut lister = BlockLister::new(args.max_blocks, args.max_particles);
    let result = reader.run(&mut lister);
    print!("{}", lister.output);

    let summary = result.with_context(|| format!("Failed to decode {}", args.input.display()))?;
    println!("{}", render_read_summary(&summary, lister.hidden));

    Ok(())
}

/// Visitor that renders blocks as text, up to a block limit
struct BlockLister {
    max_blocks: usize,
    max_particles: usize,
    listed: usize,
    hidden: usize,
    output: String,
}

impl BlockLister {
    fn new(max_blocks: usize, max_particles: usize) -> Self {
        Self {
            max_blocks,
            max_particles,
            listed: 0,
            hidden: 0,
            output: String::new(),
        }
    }

    fn has_room(&mut self) -> bool {
        if self.listed < self.max_blocks {
            self.listed += 1;
            true
        } else {
            self.hidden += 1;
            false
        }
    }
}

impl BlockVisitor for BlockLister {
    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
        if !self.has_room() {
            return Ok(());
        }

        self.output.push_str(&format!(
            "{} event {} ensemble {}: {} particles\n",
            "p".cyan(),
            block.event_number,
            block.ensemble_number,
            block.npart()
        ));

        for index in 0..block.npart().min(self.max_particles) {
            self.output.push_str(&format!("    {:>4}:", index));
            for field in block.layout().fields() {
                let text = match field.slot.kind {
                    FieldKind::Float64 => format!("{:.6}", block.float_at(field.slot, index)?),
                    FieldKind::Int32 => block.int_at(field.slot, index)?.to_string(),
                };
                self.output.push_str(&format!(" {}={}", field.name, text));
            }
            self.output.push('\n');
        }
        Ok(())
    }

    fn on_end_block(&mut self, block: &EndBlock) -> Result<(), DecodeError> {
        if self.has_room() {
            self.output.push_str(&format!(
                "{} event {} ensemble {}: impact parameter {:.3} fm\n",
                "f".green(),
                block.event_number,
                block.ensemble_number,
                block.impact_parameter
            ));
        }
        Ok(())
    }
}

fn render_read_summary(summary: &ReadSummary, hidden: usize) -> String {
    let mut out = String::new();
    if hidden > 0 {
        out.push_str(&format!("... {} more blocks\n", hidden));
    }
    out.push_str("---------------------------------------------------\n");
    out.push_str(&format!("Particle blocks: {}\n", summary.particle_blocks));
    out.push_str(&format!("End blocks:      {}\n", summary.end_blocks));
    out.push_str(&format!("Info blocks:     {}\n", summary.info_blocks));
    out.push_str(&format!("Particles:       {}\n", summary.particles));
    out.push_str(&format!("Bytes read:      {}", summary.bytes_read));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{BinaryWriter, FieldValue, Header};
    use std::io::Cursor;

    #[test]
    fn test_lister_limits_blocks_and_particles() {
        colored::control::set_override(false);

        let registry = FieldRegistry::standard();
        let mut writer = BinaryWriter::new(Vec::new(), &["p0", "pdg"], &registry).unwrap();
        writer
            .write_header(&Header {
                magic: *b"SMSH",
                format_version: 7,
                format_variant: 0,
                producer_version: "test".to_string(),
            })
            .unwrap();
        for event in 0..3 {
            writer
                .write_particle_block(
                    event,
                    0,
                    &[
                        vec![FieldValue::Float(1.5), FieldValue::Int(211)],
                        vec![FieldValue::Float(2.0), FieldValue::Int(2212)],
                    ],
                )
                .unwrap();
        }
        let bytes = writer.into_inner().unwrap();

        let reader = BinaryReader::from_reader(Cursor::new(bytes), &["p0", "pdg"], &registry).unwrap();
        let mut lister = BlockLister::new(2, 1);
        let summary = reader.run(&mut lister).unwrap();

        assert_eq!(summary.particle_blocks, 3);
        assert_eq!(lister.hidden, 1);
        assert!(lister.output.contains("p event 0 ensemble 0: 2 particles"));
        assert!(lister.output.contains("       0: p0=1.500000 pdg=211"));
        assert!(!lister.output.contains("pdg=2212"));
        assert!(render_read_summary(&summary, lister.hidden).contains("... 1 more blocks"));
    }
}
