//! Shape inference
//!
//! Sharded loads preallocate one global array per species and field. The
//! trailing dimension and element kind come from a sample shard; the row
//! count is the species' snapshot-wide total.

use std::collections::BTreeMap;

use tracing::debug;

use crate::aggregate::read_shard_header;
use crate::array::{Array, ElementKind, Shape};
use crate::config::{AllocationKind, SampleShard};
use crate::container::{ContainerBackend, ContainerHandle};
use crate::error::{Result, SnapshotError};
use crate::header::ParticleCounts;
use crate::layout::ShardLayout;
use crate::snapshot::FieldMap;
use crate::species::{FieldSelector, Species};

/// Snapshot-wide shape of `field` for `species`
///
/// `(total, components)` when the sample dataset has a positive second
/// dimension, else `(total,)`. Only the declared shape is consulted, so a
/// sample dataset with zero rows still tells vectors from scalars.
pub fn infer_shape<H: ContainerHandle>(
    sample: &H,
    species: Species,
    field: &str,
    total: usize,
) -> Result<Shape> {
    let (shape, _) = sample.dataset_shape(&species.group_name(), field)?;
    Ok(if shape.is_vector() {
        Shape::vector(total, shape.row_width())
    } else {
        Shape::scalar(total)
    })
}

/// Allocate zeroed global arrays for every selected field the sample holds
pub fn allocate_fields<H: ContainerHandle>(
    sample: &H,
    species: Species,
    fields: &FieldSelector,
    total: usize,
    allocation: AllocationKind,
) -> Result<FieldMap> {
    let group = species.group_name();
    if !sample.has_group(&group) {
        return Err(SnapshotError::ShapeInference(format!(
            "{} has no {} group to infer field shapes from",
            sample.path().display(),
            group
        )));
    }

    let mut allocated = FieldMap::new();
    for name in sample.dataset_names(&group)? {
        if !fields.includes(&name) {
            continue;
        }

        let shape = infer_shape(sample, species, &name, total)?;
        let kind = match allocation {
            AllocationKind::Widened => ElementKind::F64,
            AllocationKind::Native => sample.dataset_shape(&group, &name)?.1,
        };

        debug!(species = %species, field = %name, ?shape, ?kind, "Allocated global array");
        allocated.insert(name, Array::zeros(shape, kind));
    }

    Ok(allocated)
}

/// Pick the shard each species' field shapes are read from
///
/// `shard0` is shard 0's `NumPart_ThisFile`. Returns shard index → species
/// sampled from it, so each sample shard is opened once.
pub fn select_sample_shards<B: ContainerBackend>(
    backend: &B,
    layout: &ShardLayout,
    shard0: &ParticleCounts,
    wanted: &[Species],
    policy: SampleShard,
) -> Result<BTreeMap<usize, Vec<Species>>> {
    let mut samples: BTreeMap<usize, Vec<Species>> = BTreeMap::new();

    if policy == SampleShard::FirstOnly {
        if !wanted.is_empty() {
            samples.insert(0, wanted.to_vec());
        }
        return Ok(samples);
    }

    let mut pending: Vec<Species> = Vec::new();
    for &species in wanted {
        if shard0[species.index()] > 0 {
            samples.entry(0).or_default().push(species);
        } else {
            pending.push(species);
        }
    }

    // Scan forward, header only, until every species has a sample
    let mut index = 1;
    while !pending.is_empty() && index < layout.nfiles() {
        let counts = read_shard_header(backend, layout, index)?.num_part_this_file()?;

        let (found, rest): (Vec<Species>, Vec<Species>) =
            pending.into_iter().partition(|s| counts[s.index()] > 0);
        for species in &found {
            debug!(species = %species, shard = index, "Shard 0 holds no particles; sampling later shard");
        }
        if !found.is_empty() {
            samples.insert(index, found);
        }
        pending = rest;
        index += 1;
    }

    if let Some(species) = pending.first() {
        return Err(SnapshotError::ShapeInference(format!(
            "no shard of {} holds particles of {}",
            layout.base().display(),
            species
        )));
    }

    Ok(samples)
}
