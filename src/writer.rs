//! Shard writer
//!
//! Splits global per-species arrays into `nfiles` contiguous chunks and
//! writes each chunk set to its own shard, with a header whose
//! `NumPart_ThisFile` matches the chunk lengths.
//!
//! ## Split Policy
//! A species of `len` particles gets `len / nfiles` rows per shard; the
//! `len % nfiles` leftover rows go one apiece to the leading shards:
//! ```text
//! len = 5, nfiles = 2  →  [3, 2]
//! len = 7, nfiles = 3  →  [3, 2, 2]
//! len = 2, nfiles = 4  →  [1, 1, 0, 0]
//! ```

use std::ops::Range;

use tracing::debug;

use crate::container::{with_container, ContainerBackend, ContainerHandle, OpenMode};
use crate::error::{Result, SnapshotError};
use crate::header::{
    count_to_usize, AttrValue, Header, ParticleCounts, HEADER_GROUP, NUM_FILES_PER_SNAPSHOT,
};
use crate::layout::ShardLayout;
use crate::snapshot::ParticleData;
use crate::species::{Species, NUM_SPECIES};

/// Chunk lengths for splitting `len` rows into `parts` chunks
pub fn split_sizes(len: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let extra = len % parts;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Row ranges for splitting `len` rows into `parts` chunks
pub fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let mut start = 0;
    split_sizes(len, parts)
        .into_iter()
        .map(|size| {
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Check the particle mapping against the header before anything is written
///
/// Every active species must be present with every field's leading dimension
/// equal to the species total. With `identifier_field` set, that field must
/// exist for every active species.
pub fn validate_particles(
    totals: &ParticleCounts,
    active: &[Species],
    particles: &ParticleData,
    identifier_field: Option<&str>,
) -> Result<()> {
    for &species in active {
        let fields = particles.get(&species).ok_or_else(|| {
            SnapshotError::InvalidArgument(format!(
                "header lists {} particles of {} but no data was given",
                totals[species.index()],
                species
            ))
        })?;

        if let Some(id_field) = identifier_field {
            if !fields.contains_key(id_field) {
                return Err(SnapshotError::InvalidArgument(format!(
                    "{} has no {} field to size shards by",
                    species, id_field
                )));
            }
        }

        let total = count_to_usize(totals[species.index()])?;
        for (name, array) in fields {
            if array.rows() != total {
                return Err(SnapshotError::InvalidArgument(format!(
                    "{}/{} has {} rows but NumPart_Total says {}",
                    species,
                    name,
                    array.rows(),
                    total
                )));
            }
        }
    }

    for species in particles.keys() {
        if !active.contains(species) {
            debug!(species = %species, "Skipping species with zero total");
        }
    }

    Ok(())
}

/// Write a header plus the given species' fields into an open container
///
/// `rows` selects the slice of every field to write; `None` writes whole
/// arrays.
pub fn write_container<H: ContainerHandle>(
    handle: &mut H,
    header: &Header,
    active: &[Species],
    particles: &ParticleData,
    rows: impl Fn(Species) -> Option<Range<usize>>,
) -> Result<()> {
    handle.create_group(HEADER_GROUP)?;
    handle.write_attrs(HEADER_GROUP, header.attrs())?;

    for &species in active {
        let group = species.group_name();
        handle.create_group(&group)?;

        let Some(fields) = particles.get(&species) else {
            continue;
        };
        for (name, array) in fields {
            match rows(species) {
                Some(range) => handle.write_dataset(&group, name, &array.slice_rows(range)?)?,
                None => handle.write_dataset(&group, name, array)?,
            }
        }
    }
    Ok(())
}

/// Record the shard count in `NumFilesPerSnapshot` if the header carries it
pub fn set_file_count(header: &mut Header, nfiles: usize) {
    let value = match header.get(NUM_FILES_PER_SNAPSHOT) {
        None => return,
        Some(AttrValue::UInt(_)) => AttrValue::UInt(nfiles as u64),
        Some(_) => AttrValue::Int(nfiles as i64),
    };
    header.set(NUM_FILES_PER_SNAPSHOT, value);
}

/// Partition `particles` across the layout's shards and write them
///
/// `NumPart_ThisFile` of every shard is rebuilt from the identifier-field
/// chunks; species with a zero total get zero.
///
/// Shards are written in ascending order; a failure stops the loop and
/// leaves already-written shards in place.
pub fn write_shards<B: ContainerBackend>(
    backend: &B,
    layout: &ShardLayout,
    header: &Header,
    particles: &ParticleData,
    identifier_field: &str,
) -> Result<()> {
    let totals = header.particle_totals()?;
    let active = header.active_species()?;
    validate_particles(&totals, &active, particles, Some(identifier_field))?;

    let nfiles = layout.nfiles();

    // Per active species, the identifier field's chunk ranges; every other
    // field of the species has the same length and splits identically
    let mut ranges: Vec<(Species, Vec<Range<usize>>)> = Vec::with_capacity(active.len());
    for &species in &active {
        let ids = particles
            .get(&species)
            .and_then(|f| f.get(identifier_field))
            .ok_or_else(|| {
                SnapshotError::InvalidArgument(format!("{} lost its {}", species, identifier_field))
            })?;
        ranges.push((species, chunk_ranges(ids.rows(), nfiles)));
    }

    let mut base = header.clone();
    set_file_count(&mut base, nfiles);

    for index in 0..nfiles {
        let mut shard_header = base.clone();
        let mut this_file = [0; NUM_SPECIES];
        for (species, chunks) in &ranges {
            this_file[species.index()] = chunks[index].len() as u64;
        }
        shard_header.set_num_part_this_file(&this_file)?;

        debug!(shard = index, ?this_file, "Writing shard");

        let rows = |species: Species| {
            ranges
                .iter()
                .find(|(s, _)| *s == species)
                .map(|(_, chunks)| chunks[index].clone())
        };

        with_container(backend, &layout.shard_path(index), OpenMode::Write, |h| {
            write_container(h, &shard_header, &active, particles, rows)
        })?;
    }

    Ok(())
}
