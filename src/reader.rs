//! Shard reader
//!
//! Fills preallocated global arrays by concatenating shard slices in
//! ascending shard order. Per-species write positions travel as an explicit
//! [`Offsets`] value: each shard step takes the offsets reached so far and
//! returns the advanced ones.
//!
//! Particle order in the result is shard 0's particles, then shard 1's, and
//! so on; nothing is sorted or matched by identifier.

use tracing::debug;

use crate::container::{with_container, ContainerBackend, ContainerHandle, OpenMode};
use crate::error::{Result, SnapshotError};
use crate::header::{count_to_usize, Header, ParticleCounts, HEADER_GROUP};
use crate::layout::ShardLayout;
use crate::snapshot::ParticleData;
use crate::species::{FieldSelector, Species, NUM_SPECIES};

/// Next row to fill, per species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offsets([u64; NUM_SPECIES]);

impl Offsets {
    /// All species at row 0
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, species: Species) -> u64 {
        self.0[species.index()]
    }

    /// Offsets with `species` moved forward by `rows`
    pub fn advance(mut self, species: Species, rows: u64) -> Result<Self> {
        let slot = &mut self.0[species.index()];
        *slot = slot.checked_add(rows).ok_or_else(|| {
            SnapshotError::InvalidHeader(format!(
                "NumPart_ThisFile of {} overflows a 64-bit count across shards",
                species
            ))
        })?;
        Ok(self)
    }

    /// Rows filled so far, per species
    pub fn as_counts(&self) -> ParticleCounts {
        self.0
    }
}

/// Copy one shard's slices into the global arrays
///
/// Only species present in `particles` are read, and only the fields
/// `fields` selects. Species with no particles in this shard are skipped
/// without touching their group.
pub fn read_shard<H: ContainerHandle>(
    shard: &H,
    fields: &FieldSelector,
    particles: &mut ParticleData,
    offsets: Offsets,
) -> Result<Offsets> {
    let this_file = Header::from_attrs(shard.read_attrs(HEADER_GROUP)?).num_part_this_file()?;
    let mut next = offsets;

    for (&species, global) in particles.iter_mut() {
        let count = this_file[species.index()];
        if count == 0 {
            continue;
        }

        let group = species.group_name();
        let offset = count_to_usize(offsets.get(species))?;
        let rows = count_to_usize(count)?;

        debug!(
            shard = %shard.path().display(),
            species = %species,
            count,
            offset,
            "Reading shard slice"
        );

        for name in shard.dataset_names(&group)? {
            if !fields.includes(&name) {
                continue;
            }

            let target = global.get_mut(&name).ok_or_else(|| {
                SnapshotError::ShapeInference(format!(
                    "{} holds {}/{} but the sample shard did not",
                    shard.path().display(),
                    group,
                    name
                ))
            })?;

            let slice = shard.read_dataset(&group, &name)?;
            if slice.rows() != rows {
                return Err(SnapshotError::CountMismatch(format!(
                    "{} {}/{} has {} rows but NumPart_ThisFile says {}",
                    shard.path().display(),
                    group,
                    name,
                    slice.rows(),
                    rows
                )));
            }

            target.assign_rows(offset, &slice)?;
        }

        next = next.advance(species, count)?;
    }

    Ok(next)
}

/// Run [`read_shard`] over every shard, opening them one at a time
///
/// Returns the final offsets, i.e. the rows filled per species.
pub fn read_shards<B: ContainerBackend>(
    backend: &B,
    layout: &ShardLayout,
    fields: &FieldSelector,
    particles: &mut ParticleData,
) -> Result<Offsets> {
    let mut offsets = Offsets::new();
    for index in 0..layout.nfiles() {
        offsets = with_container(backend, &layout.shard_path(index), OpenMode::Read, |h| {
            read_shard(h, fields, particles, offsets)
        })?;
    }
    Ok(offsets)
}
