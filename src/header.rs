//! Snapshot headers
//!
//! The `Header` group carries snapshot metadata as named attributes. Two of
//! them drive sharding:
//! - `NumPart_Total`: particles per species across the whole snapshot
//! - `NumPart_ThisFile`: particles per species in one shard
//!
//! Snapshots with more than 2^32 particles of a species also carry
//! `NumPart_Total_HighWord`; the full count is `low + (high << 32)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};
use crate::species::{Species, NUM_SPECIES};

/// Name of the header group
pub const HEADER_GROUP: &str = "Header";

/// Snapshot-wide particle counts
pub const NUM_PART_TOTAL: &str = "NumPart_Total";

/// Upper 32 bits of the snapshot-wide particle counts
pub const NUM_PART_TOTAL_HIGH_WORD: &str = "NumPart_Total_HighWord";

/// Shard-local particle counts
pub const NUM_PART_THIS_FILE: &str = "NumPart_ThisFile";

/// Number of shards the snapshot was written as
pub const NUM_FILES_PER_SNAPSHOT: &str = "NumFilesPerSnapshot";

/// Per-species particle counts
pub type ParticleCounts = [u64; NUM_SPECIES];

/// Sum of all species counts, saturating at `u64::MAX`
pub fn count_sum(counts: &ParticleCounts) -> u64 {
    counts.iter().fold(0u64, |sum, &c| sum.saturating_add(c))
}

/// Add `counts` onto `running` species by species
pub(crate) fn add_counts(running: &mut ParticleCounts, counts: &ParticleCounts) -> Result<()> {
    for (species, (total, &count)) in running.iter_mut().zip(counts).enumerate() {
        *total = total.checked_add(count).ok_or_else(|| {
            SnapshotError::InvalidHeader(format!(
                "particle count of PartType{} overflows a 64-bit count",
                species
            ))
        })?;
    }
    Ok(())
}

/// Convert a particle count into an in-memory length
pub(crate) fn count_to_usize(count: u64) -> Result<usize> {
    usize::try_from(count).map_err(|_| {
        SnapshotError::CountMismatch(format!("{} particles do not fit in memory", count))
    })
}

// =============================================================================
// Attribute Values
// =============================================================================

/// A header attribute: scalar or small array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    UIntArray(Vec<u64>),
    FloatArray(Vec<f64>),
}

/// Attribute name → value
pub type Attributes = BTreeMap<String, AttrValue>;

// =============================================================================
// Header
// =============================================================================

/// Snapshot or shard metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    attrs: Attributes,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attrs(attrs: Attributes) -> Self {
        Self { attrs }
    }

    /// Header with `NumPart_Total` and `NumPart_ThisFile` both set to `totals`
    pub fn with_totals(totals: ParticleCounts) -> Self {
        let mut header = Self::new();
        header.set(NUM_PART_TOTAL, AttrValue::UIntArray(totals.to_vec()));
        header.set(NUM_PART_THIS_FILE, AttrValue::UIntArray(totals.to_vec()));
        header
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attrs.insert(name.into(), value);
    }

    /// Parse a six-slot count attribute
    pub fn counts(&self, name: &str) -> Result<ParticleCounts> {
        let value = self
            .attrs
            .get(name)
            .ok_or_else(|| SnapshotError::InvalidHeader(format!("missing attribute {}", name)))?;

        let values: Vec<u64> = match value {
            AttrValue::UIntArray(v) => v.clone(),
            AttrValue::IntArray(v) => v
                .iter()
                .map(|&c| {
                    u64::try_from(c).map_err(|_| {
                        SnapshotError::InvalidHeader(format!("{} holds negative count {}", name, c))
                    })
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(SnapshotError::InvalidHeader(format!(
                    "{} must be an integer array, found {:?}",
                    name, other
                )))
            }
        };

        values.try_into().map_err(|v: Vec<u64>| {
            SnapshotError::InvalidHeader(format!(
                "{} has {} entries, expected {}",
                name,
                v.len(),
                NUM_SPECIES
            ))
        })
    }

    /// Write a six-slot count attribute, keeping the stored integer variant
    pub fn set_counts(&mut self, name: &str, counts: &ParticleCounts) -> Result<()> {
        let value = match self.attrs.get(name) {
            Some(AttrValue::IntArray(_)) => AttrValue::IntArray(
                counts
                    .iter()
                    .map(|&c| {
                        i64::try_from(c).map_err(|_| {
                            SnapshotError::InvalidHeader(format!("{} cannot hold {}", name, c))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            _ => AttrValue::UIntArray(counts.to_vec()),
        };
        self.attrs.insert(name.to_string(), value);
        Ok(())
    }

    /// Shard-local counts
    pub fn num_part_this_file(&self) -> Result<ParticleCounts> {
        self.counts(NUM_PART_THIS_FILE)
    }

    pub fn set_num_part_this_file(&mut self, counts: &ParticleCounts) -> Result<()> {
        self.set_counts(NUM_PART_THIS_FILE, counts)
    }

    /// Snapshot-wide counts, folding in `NumPart_Total_HighWord` when present
    pub fn particle_totals(&self) -> Result<ParticleCounts> {
        let mut totals = self.counts(NUM_PART_TOTAL)?;
        if self.contains(NUM_PART_TOTAL_HIGH_WORD) {
            let high = self.counts(NUM_PART_TOTAL_HIGH_WORD)?;
            for (total, high) in totals.iter_mut().zip(high) {
                let low = *total;
                *total = high
                    .checked_mul(1 << 32)
                    .and_then(|h| h.checked_add(low))
                    .ok_or_else(|| {
                        SnapshotError::InvalidHeader(format!(
                            "{} = {} with {} = {} overflows a 64-bit count",
                            NUM_PART_TOTAL, low, NUM_PART_TOTAL_HIGH_WORD, high
                        ))
                    })?;
            }
        }
        Ok(totals)
    }

    /// Store snapshot-wide counts
    ///
    /// Counts of 2^32 or more are split into `NumPart_Total` (low words) and
    /// `NumPart_Total_HighWord`. An existing high-word attribute is always
    /// rewritten so the two stay consistent.
    pub fn set_particle_totals(&mut self, totals: &ParticleCounts) -> Result<()> {
        let needs_high = totals.iter().any(|&t| t >> 32 != 0);
        if needs_high || self.contains(NUM_PART_TOTAL_HIGH_WORD) {
            let low = totals.map(|t| t & 0xFFFF_FFFF);
            let high = totals.map(|t| t >> 32);
            self.set_counts(NUM_PART_TOTAL, &low)?;
            self.set_counts(NUM_PART_TOTAL_HIGH_WORD, &high)
        } else {
            self.set_counts(NUM_PART_TOTAL, totals)
        }
    }

    /// Species with a positive snapshot-wide count
    pub fn active_species(&self) -> Result<Vec<Species>> {
        let totals = self.particle_totals()?;
        Ok(Species::ALL
            .into_iter()
            .filter(|s| totals[s.index()] > 0)
            .collect())
    }
}

impl From<Attributes> for Header {
    fn from(attrs: Attributes) -> Self {
        Self::from_attrs(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accepts_signed_arrays() {
        let mut header = Header::new();
        header.set(NUM_PART_THIS_FILE, AttrValue::IntArray(vec![0, 3, 0, 0, 1, 0]));
        assert_eq!(header.num_part_this_file().unwrap(), [0, 3, 0, 0, 1, 0]);
    }

    #[test]
    fn test_counts_rejects_negative_and_short_arrays() {
        let mut header = Header::new();
        header.set(NUM_PART_THIS_FILE, AttrValue::IntArray(vec![0, -1, 0, 0, 0, 0]));
        assert!(matches!(
            header.num_part_this_file(),
            Err(SnapshotError::InvalidHeader(_))
        ));

        header.set(NUM_PART_THIS_FILE, AttrValue::UIntArray(vec![1, 2]));
        assert!(matches!(
            header.num_part_this_file(),
            Err(SnapshotError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_set_counts_keeps_signed_variant() {
        let mut header = Header::new();
        header.set(NUM_PART_THIS_FILE, AttrValue::IntArray(vec![0; 6]));
        header.set_num_part_this_file(&[0, 3, 0, 0, 0, 0]).unwrap();
        assert_eq!(
            header.get(NUM_PART_THIS_FILE),
            Some(&AttrValue::IntArray(vec![0, 3, 0, 0, 0, 0]))
        );
    }

    #[test]
    fn test_high_word_totals() {
        let mut header = Header::new();
        header.set(NUM_PART_TOTAL, AttrValue::UIntArray(vec![0, 5, 0, 0, 0, 0]));
        header.set(NUM_PART_TOTAL_HIGH_WORD, AttrValue::UIntArray(vec![0, 1, 0, 0, 0, 0]));
        assert_eq!(header.particle_totals().unwrap()[1], (1u64 << 32) + 5);

        let big = [0, (2u64 << 32) + 7, 0, 0, 0, 0];
        header.set_particle_totals(&big).unwrap();
        assert_eq!(header.counts(NUM_PART_TOTAL).unwrap()[1], 7);
        assert_eq!(header.counts(NUM_PART_TOTAL_HIGH_WORD).unwrap()[1], 2);
        assert_eq!(header.particle_totals().unwrap(), big);
    }

    #[test]
    fn test_active_species() {
        let header = Header::with_totals([0, 5, 0, 0, 2, 0]);
        assert_eq!(
            header.active_species().unwrap(),
            vec![Species::DARK_MATTER, Species::STARS]
        );
    }

    #[test]
    fn test_high_word_overflow_is_header_error() {
        let mut header = Header::new();
        header.set(NUM_PART_TOTAL, AttrValue::UIntArray(vec![0, u64::MAX, 0, 0, 0, 0]));
        header.set(NUM_PART_TOTAL_HIGH_WORD, AttrValue::UIntArray(vec![0, 1, 0, 0, 0, 0]));
        assert!(matches!(
            header.particle_totals(),
            Err(SnapshotError::InvalidHeader(_))
        ));

        header.set(NUM_PART_TOTAL, AttrValue::UIntArray(vec![0; 6]));
        header.set(NUM_PART_TOTAL_HIGH_WORD, AttrValue::UIntArray(vec![0, 0, 1 << 32, 0, 0, 0]));
        assert!(matches!(
            header.particle_totals(),
            Err(SnapshotError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_add_counts_overflow_is_header_error() {
        let mut running = [0, u64::MAX, 0, 0, 0, 0];
        add_counts(&mut running, &[1, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(running, [1, u64::MAX, 0, 0, 0, 0]);

        let err = add_counts(&mut running, &[0, 1, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidHeader(_)));
        assert_eq!(count_sum(&running), u64::MAX);
    }
}
