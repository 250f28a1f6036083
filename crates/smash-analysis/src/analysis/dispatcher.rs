//! Fan-out of one file's blocks to every active analysis.

use super::Analysis;
use crate::aggregator::DataTree;
use crate::parser::{BlockVisitor, EndBlock, Header, ParticleBlock};
use crate::utils::config::{END_BLOCKS_NODE, FILES_NODE, META_NODE, PARTICLE_BLOCKS_NODE};
use crate::utils::error::DecodeError;
use log::debug;

/// Block visitor that forwards to a set of analyses
///
/// Errors from an analysis are tagged with its name and abort the file.
pub struct Dispatcher {
    analyses: Vec<Box<dyn Analysis>>,
    producer_version: String,
    particle_blocks: i64,
    end_blocks: i64,
}

impl Dispatcher {
    pub fn new(analyses: Vec<Box<dyn Analysis>>) -> Self {
        Self {
            analyses,
            producer_version: String::new(),
            particle_blocks: 0,
            end_blocks: 0,
        }
    }

    /// Producer version seen in the file header (empty before `on_header`)
    pub fn producer_version(&self) -> &str {
        &self.producer_version
    }

    /// Finalize every analysis and collect the file's result tree
    ///
    /// **Public** - called once the reader has consumed the whole file
    ///
    /// # Returns
    /// A tree with one child per analysis (named after it) plus `meta/`
    /// counters for files, particle blocks and end blocks.
    pub fn into_tree(self) -> Result<DataTree, DecodeError> {
        let mut tree = DataTree::new();
        let root = tree.root();

        for mut analysis in self.analyses {
            let name = analysis.name().to_string();
            analysis.finalize().map_err(|source| tag(&name, source))?;

            let results = analysis.save();
            let node = tree.child(root, &name);
            tree.merge_at(node, &results, results.root())?;
            debug!("Collected results of '{}'", name);
        }

        let meta = tree.child(root, META_NODE);
        let files = tree.child(meta, FILES_NODE);
        tree.add_int(files, 1)?;
        let particle_blocks = tree.child(meta, PARTICLE_BLOCKS_NODE);
        tree.add_int(particle_blocks, self.particle_blocks)?;
        let end_blocks = tree.child(meta, END_BLOCKS_NODE);
        tree.add_int(end_blocks, self.end_blocks)?;

        Ok(tree)
    }
}

fn tag(analysis: &str, source: DecodeError) -> DecodeError {
    DecodeError::Analysis {
        analysis: analysis.to_string(),
        source: Box::new(source),
    }
}

impl BlockVisitor for Dispatcher {
    fn on_header(&mut self, header: &Header) -> Result<(), DecodeError> {
        self.producer_version = header.producer_version.clone();
        for analysis in &mut self.analyses {
            analysis
                .on_header(header)
                .map_err(|source| tag(analysis.name(), source))?;
        }
        Ok(())
    }

    fn on_particle_block(&mut self, block: &ParticleBlock<'_>) -> Result<(), DecodeError> {
        self.particle_blocks += 1;
        for analysis in &mut self.analyses {
            analysis
                .on_particle_block(block)
                .map_err(|source| tag(analysis.name(), source))?;
        }
        Ok(())
    }

    fn on_end_block(&mut self, block: &EndBlock) -> Result<(), DecodeError> {
        self.end_blocks += 1;
        for analysis in &mut self.analyses {
            analysis
                .on_end_block(block)
                .map_err(|source| tag(analysis.name(), source))?;
        }
        Ok(())
    }
}
