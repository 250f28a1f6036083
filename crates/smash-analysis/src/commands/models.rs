use std::path::PathBuf;

/// Arguments for the run command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Input specifications, `PATH` or `PATH:name=value,...`
    pub inputs: Vec<String>,

    /// Optional run configuration file (TOML)
    pub config: Option<PathBuf>,

    /// Record layout; overrides the configuration file
    pub fields: Option<Vec<String>>,

    /// Analyses to run; overrides the configuration file when non-empty
    pub analyses: Vec<String>,

    /// Output path for the results document
    pub output: Option<PathBuf>,

    /// Stop at the first input that fails
    pub fail_fast: bool,

    /// Print a terminal summary after writing
    pub print_summary: bool,

    /// Tree depth shown in the summary
    pub summary_depth: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            config: None,
            fields: None,
            analyses: Vec::new(),
            output: None,
            fail_fast: false,
            print_summary: false,
            summary_depth: 3,
        }
    }
}

/// Arguments for the inspect command
#[derive(Debug, Clone)]
pub struct InspectArgs {
    /// Binary particle file
    pub input: PathBuf,

    /// Record layout; the default layout when absent
    pub fields: Option<Vec<String>>,

    /// Number of particle blocks listed in detail
    pub max_blocks: usize,

    /// Particles printed per listed block
    pub max_particles: usize,
}

impl Default for InspectArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            fields: None,
            max_blocks: 10,
            max_particles: 0,
        }
    }
}
