//! Header aggregation
//!
//! Builds the snapshot-wide header of a sharded snapshot from shard 0's
//! header. Some writers leave `NumPart_Total` zeroed (or out entirely) and
//! record only per-shard counts; the totals are then rebuilt by summing
//! `NumPart_ThisFile` over every shard.

use tracing::{debug, info};

use crate::container::{with_container, ContainerBackend, ContainerHandle, OpenMode};
use crate::error::{Result, SnapshotError};
use crate::header::{add_counts, count_sum, Header, ParticleCounts, HEADER_GROUP, NUM_PART_TOTAL};
use crate::layout::ShardLayout;
use crate::species::NUM_SPECIES;

/// Read a shard's header group
pub fn read_shard_header<B: ContainerBackend>(
    backend: &B,
    layout: &ShardLayout,
    index: usize,
) -> Result<Header> {
    with_container(backend, &layout.shard_path(index), OpenMode::Read, |h| {
        Ok(Header::from_attrs(h.read_attrs(HEADER_GROUP)?))
    })
}

/// Snapshot-wide header for allocation sizing
///
/// 1. Shard 0's attributes are taken verbatim.
/// 2. Stored totals summing to zero are rebuilt from `NumPart_ThisFile` over
///    all shards, opened one at a time, header only.
/// 3. Non-zero stored totals are trusted as-is.
///
/// Fails with `EmptySnapshot` when both shard 0's totals and its
/// `NumPart_ThisFile` sum to zero.
pub fn aggregate_header<B: ContainerBackend>(backend: &B, layout: &ShardLayout) -> Result<Header> {
    let mut header = read_shard_header(backend, layout, 0)?;

    let stored = if header.contains(NUM_PART_TOTAL) {
        header.particle_totals()?
    } else {
        [0; NUM_SPECIES]
    };

    if count_sum(&stored) > 0 {
        debug!(total = count_sum(&stored), "Using stored particle totals");
        return Ok(header);
    }

    let first = header.num_part_this_file()?;
    if count_sum(&first) == 0 {
        return Err(SnapshotError::EmptySnapshot);
    }

    let totals = sum_shard_counts(backend, layout, first)?;
    header.set_particle_totals(&totals)?;

    info!(
        total = count_sum(&totals),
        shards = layout.nfiles(),
        "Total number of particles re-calculated from per-shard counts"
    );
    Ok(header)
}

/// Add shards 1..n's `NumPart_ThisFile` onto shard 0's
fn sum_shard_counts<B: ContainerBackend>(
    backend: &B,
    layout: &ShardLayout,
    first: ParticleCounts,
) -> Result<ParticleCounts> {
    let mut running = first;
    for index in 1..layout.nfiles() {
        let counts = read_shard_header(backend, layout, index)?.num_part_this_file()?;
        add_counts(&mut running, &counts)?;
        debug!(shard = index, ?counts, "Added shard particle counts");
    }
    Ok(running)
}
