//! Field layout registry and per-run layout projection.
//!
//! The binary particle format carries no schema: which byte range of a
//! particle record holds which quantity is decided by the caller when the
//! file is opened. The registry declares every known field with its kind and
//! width, and `project` turns an ordered request list into byte offsets.

use crate::utils::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Physical representation of a particle field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Float64,
    Int32,
}

impl FieldKind {
    /// Width of one value in bytes
    pub fn width(self) -> usize {
        match self {
            FieldKind::Float64 => std::mem::size_of::<f64>(),
            FieldKind::Int32 => std::mem::size_of::<i32>(),
        }
    }

    /// Short name used in error messages and listings
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Float64 => "float64",
            FieldKind::Int32 => "int32",
        }
    }
}

/// Declaration of one field in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
        }
    }
}

/// Standard particle fields of the simulation's binary output
const STANDARD_FIELDS: &[(&str, FieldKind, &str)] = &[
    ("t", FieldKind::Float64, "time coordinate [fm]"),
    ("x", FieldKind::Float64, "x coordinate [fm]"),
    ("y", FieldKind::Float64, "y coordinate [fm]"),
    ("z", FieldKind::Float64, "z coordinate [fm]"),
    ("mass", FieldKind::Float64, "pole mass [GeV]"),
    ("p0", FieldKind::Float64, "energy [GeV]"),
    ("px", FieldKind::Float64, "x momentum [GeV]"),
    ("py", FieldKind::Float64, "y momentum [GeV]"),
    ("pz", FieldKind::Float64, "longitudinal momentum [GeV]"),
    ("pdg", FieldKind::Int32, "PDG particle code"),
    ("id", FieldKind::Int32, "particle identifier"),
    ("charge", FieldKind::Int32, "electric charge"),
    ("ncoll", FieldKind::Int32, "number of collisions"),
    ("form_time", FieldKind::Float64, "formation time [fm]"),
    ("xsecfac", FieldKind::Float64, "cross section scaling factor"),
    ("proc_id_origin", FieldKind::Int32, "id of the last process"),
    ("proc_type_origin", FieldKind::Int32, "type of the last process"),
    ("time_last_coll", FieldKind::Float64, "time of the last collision [fm]"),
    ("pdg_mother1", FieldKind::Int32, "PDG code of the first mother"),
    ("pdg_mother2", FieldKind::Int32, "PDG code of the second mother"),
    ("baryon_density", FieldKind::Float64, "net baryon density at the particle"),
];

/// Descriptive aliases accepted in field requests
const STANDARD_ALIASES: &[(&str, &str)] = &[
    ("energy", "p0"),
    ("longitudinal-momentum", "pz"),
    ("particle-type-code", "pdg"),
    ("pdgid", "pdg"),
];

/// Immutable table of known particle fields
///
/// Built explicitly and handed to every decoder, so nothing about the
/// schema lives in process-wide mutable state.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl FieldRegistry {
    /// Create a registry from a custom field table
    ///
    /// Later declarations of an already declared name are ignored.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let mut unique = Vec::with_capacity(fields.len());
        let mut index = HashMap::new();
        for spec in fields {
            if index.contains_key(&spec.name) {
                continue;
            }
            index.insert(spec.name.clone(), unique.len());
            unique.push(spec);
        }

        Self {
            fields: unique,
            index,
            aliases: HashMap::new(),
        }
    }

    /// The simulation's standard particle field table
    pub fn standard() -> Self {
        let fields = STANDARD_FIELDS
            .iter()
            .map(|(name, kind, description)| FieldSpec::new(*name, *kind, *description))
            .collect();

        STANDARD_ALIASES
            .iter()
            .fold(Self::new(fields), |registry, (alias, target)| {
                registry.with_alias(*alias, *target)
            })
    }

    /// Register an alternative name for a declared field
    ///
    /// Aliases pointing at undeclared fields are dropped.
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        if self.index.contains_key(&target) {
            self.aliases.insert(alias.into(), target);
        }
        self
    }

    /// Resolve a requested name (possibly an alias) to its declaration
    pub fn lookup(&self, name: &str) -> Result<&FieldSpec, LayoutError> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.index
            .get(canonical)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| LayoutError::UnknownField(name.to_string()))
    }

    /// Byte width of a field
    pub fn width_of(&self, name: &str) -> Result<usize, LayoutError> {
        self.lookup(name).map(|spec| spec.kind.width())
    }

    /// Kind of a field
    pub fn kind_of(&self, name: &str) -> Result<FieldKind, LayoutError> {
        self.lookup(name).map(|spec| spec.kind)
    }

    /// All declared fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Alias → canonical name pairs, sorted by alias
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Project an ordered field request into a record layout
    ///
    /// **Public** - called once per decoder, before any byte is read
    ///
    /// # Arguments
    /// * `names` - Requested field names in record order
    ///
    /// # Errors
    /// * `LayoutError::UnknownField` - a name is not declared
    /// * `LayoutError::DuplicateField` - a field is requested twice (aliases included)
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Layout, LayoutError> {
        let mut slots: Vec<ProjectedField> = Vec::with_capacity(names.len());
        let mut offset = 0;

        for name in names {
            let spec = self.lookup(name.as_ref())?;
            if slots.iter().any(|slot| slot.name == spec.name) {
                return Err(LayoutError::DuplicateField(spec.name.clone()));
            }

            slots.push(ProjectedField {
                name: spec.name.clone(),
                slot: FieldSlot {
                    offset,
                    kind: spec.kind,
                },
            });
            offset += spec.kind.width();
        }

        Ok(Layout {
            fields: slots,
            record_width: offset,
            aliases: self.aliases.clone(),
        })
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Position and kind of one field inside a particle record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub offset: usize,
    pub kind: FieldKind,
}

/// A requested field with its resolved slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    pub name: String,
    pub slot: FieldSlot,
}

/// Record layout for one decoder instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<ProjectedField>,
    record_width: usize,
    aliases: HashMap<String, String>,
}

impl Layout {
    /// Bytes per particle record
    pub fn record_width(&self) -> usize {
        self.record_width
    }

    /// Projected fields in record order
    pub fn fields(&self) -> &[ProjectedField] {
        &self.fields
    }

    /// Whether a field (or alias) is part of this layout
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Slot of a projected field, or `None` when it was not requested
    pub fn find(&self, name: &str) -> Option<FieldSlot> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.fields
            .iter()
            .find(|field| field.name == canonical)
            .map(|field| field.slot)
    }
}
