//! Configuration and constants for the decoder and the CLI.

/// Current results document schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Block tags of the particle binary format
pub const TAG_PARTICLES: u8 = b'p';
pub const TAG_END_OF_EVENT: u8 = b'f';
pub const TAG_INFO: u8 = b'i';
pub const BLOCK_TAGS: &[u8] = &[TAG_PARTICLES, TAG_END_OF_EVENT, TAG_INFO];

// Fixed block sizes (densely packed, no padding)
pub const PARTICLE_BLOCK_HEADER_SIZE: usize = 4 + 4 + 4;
pub const END_BLOCK_SIZE: usize = 4 + 4 + 8 + 1;
pub const HEADER_FIXED_SIZE: usize = 4 + 2 + 2 + 4;

/// Decimal digits kept when a float is used inside a configuration key
pub const KEY_FLOAT_DECIMALS: u32 = 6;

/// Default per-particle layout written by the simulation's binary output
pub const DEFAULT_FIELDS: &[&str] = &[
    "t", "x", "y", "z", "mass", "p0", "px", "py", "pz", "pdg", "id", "charge", "ncoll",
    "form_time", "xsecfac", "proc_id_origin", "proc_type_origin", "time_last_coll",
    "pdg_mother1", "pdg_mother2", "baryon_density",
];

/// Default output path for the results document
pub const DEFAULT_OUTPUT: &str = "artifacts/results.json";

// Node names shared by the dispatcher and the summaries
pub const META_NODE: &str = "meta";
pub const FILES_NODE: &str = "files";
pub const PARTICLE_BLOCKS_NODE: &str = "particle_blocks";
pub const END_BLOCKS_NODE: &str = "end_blocks";
