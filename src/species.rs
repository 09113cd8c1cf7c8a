//! Particle species and selectors
//!
//! A snapshot holds up to six particle species, each stored in its own
//! `PartType<i>` group. Loads take a species selector and a field selector;
//! both accept a single item or a collection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

/// Number of particle species in a snapshot
pub const NUM_SPECIES: usize = 6;

/// Group name prefix for species groups
const GROUP_PREFIX: &str = "PartType";

/// One of the six particle species (`PartType0`..`PartType5`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Species(u8);

impl Species {
    pub const GAS: Species = Species(0);
    pub const DARK_MATTER: Species = Species(1);
    pub const DISK: Species = Species(2);
    pub const BULGE: Species = Species(3);
    pub const STARS: Species = Species(4);
    pub const BLACK_HOLES: Species = Species(5);

    /// All species in index order
    pub const ALL: [Species; NUM_SPECIES] = [
        Species::GAS,
        Species::DARK_MATTER,
        Species::DISK,
        Species::BULGE,
        Species::STARS,
        Species::BLACK_HOLES,
    ];

    /// Species for a particle-type index (0..=5)
    pub fn new(index: usize) -> Result<Self> {
        if index < NUM_SPECIES {
            Ok(Species(index as u8))
        } else {
            Err(SnapshotError::InvalidArgument(format!(
                "particle type {} out of range 0..{}",
                index, NUM_SPECIES
            )))
        }
    }

    /// Particle-type index
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Container group holding this species: "PartType1"
    pub fn group_name(self) -> String {
        format!("{}{}", GROUP_PREFIX, self.0)
    }

    /// Parse a group name back into a species
    /// "PartType4" → Some(STARS)
    pub fn from_group_name(name: &str) -> Option<Self> {
        let index: usize = name.strip_prefix(GROUP_PREFIX)?.parse().ok()?;
        Species::new(index).ok()
    }
}

impl TryFrom<usize> for Species {
    type Error = SnapshotError;

    fn try_from(index: usize) -> Result<Self> {
        Species::new(index)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", GROUP_PREFIX, self.0)
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Which items a load should touch: everything, one item, or a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    One(T),
    Many(Vec<T>),
}

/// Species selector for loads
pub type SpeciesSelector = Selection<Species>;

/// Field-name selector for loads
pub type FieldSelector = Selection<String>;

impl Selection<Species> {
    /// Selected species in the order given, duplicates removed
    ///
    /// `All` yields every species in index order.
    pub fn species(&self) -> Vec<Species> {
        match self {
            Selection::All => Species::ALL.to_vec(),
            Selection::One(one) => vec![*one],
            Selection::Many(many) => {
                let mut out: Vec<Species> = Vec::with_capacity(many.len());
                for s in many {
                    if !out.contains(s) {
                        out.push(*s);
                    }
                }
                out
            }
        }
    }
}

impl Selection<String> {
    /// Whether the field `name` is selected
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::One(one) => one == name,
            Selection::Many(many) => many.iter().any(|m| m == name),
        }
    }
}

impl Default for Selection<Species> {
    fn default() -> Self {
        Selection::One(Species::GAS)
    }
}

impl Default for Selection<String> {
    fn default() -> Self {
        Selection::One("ParticleIDs".to_string())
    }
}

impl From<Species> for Selection<Species> {
    fn from(species: Species) -> Self {
        Selection::One(species)
    }
}

impl From<Vec<Species>> for Selection<Species> {
    fn from(species: Vec<Species>) -> Self {
        Selection::Many(species)
    }
}

impl From<&[Species]> for Selection<Species> {
    fn from(species: &[Species]) -> Self {
        Selection::Many(species.to_vec())
    }
}

impl<const N: usize> From<[Species; N]> for Selection<Species> {
    fn from(species: [Species; N]) -> Self {
        Selection::Many(species.to_vec())
    }
}

impl From<&str> for Selection<String> {
    fn from(name: &str) -> Self {
        Selection::One(name.to_string())
    }
}

impl From<String> for Selection<String> {
    fn from(name: String) -> Self {
        Selection::One(name)
    }
}

impl From<Vec<String>> for Selection<String> {
    fn from(names: Vec<String>) -> Self {
        Selection::Many(names)
    }
}

impl From<Vec<&str>> for Selection<String> {
    fn from(names: Vec<&str>) -> Self {
        Selection::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Selection<String> {
    fn from(names: &[&str]) -> Self {
        Selection::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selection<String> {
    fn from(names: [&str; N]) -> Self {
        Selection::Many(names.iter().map(|n| n.to_string()).collect())
    }
}
