//! In-memory snapshot
//!
//! A header plus, for every loaded species, its fields by name.

use std::collections::BTreeMap;

use crate::array::Array;
use crate::header::Header;
use crate::species::Species;

/// Field name → array, for one species
pub type FieldMap = BTreeMap<String, Array>;

/// Species → fields
pub type ParticleData = BTreeMap<Species, FieldMap>;

/// A fully materialised snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub header: Header,
    pub particles: ParticleData,
}

impl Snapshot {
    pub fn new(header: Header, particles: ParticleData) -> Self {
        Self { header, particles }
    }

    /// Fields loaded for `species`
    pub fn fields(&self, species: Species) -> Option<&FieldMap> {
        self.particles.get(&species)
    }

    /// One field of one species
    pub fn field(&self, species: Species, name: &str) -> Option<&Array> {
        self.particles.get(&species)?.get(name)
    }

    /// Species present in the particle mapping, in index order
    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.particles.keys().copied()
    }
}
