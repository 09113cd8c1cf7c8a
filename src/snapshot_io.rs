//! Snapshot I/O
//!
//! Front door for loading and storing snapshots.
//!
//! ## Responsibilities
//! - Resolve base name + shard count into container paths
//! - Single file: read or write the lone container verbatim
//! - Sharded load: aggregate headers → infer shapes → fill arrays shard by shard
//! - Sharded store: validate → partition → write shard by shard
//!
//! Every call is synchronous and single-threaded. Shards are opened one at a
//! time in ascending order and released before the next one is opened.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::aggregate::aggregate_header;
use crate::config::Config;
use crate::container::{with_container, ContainerBackend, ContainerHandle, FileBackend, OpenMode};
use crate::error::Result;
use crate::header::{count_sum, count_to_usize, Header, HEADER_GROUP};
use crate::layout::ShardLayout;
use crate::reader::read_shards;
use crate::shape::{allocate_fields, select_sample_shards};
use crate::snapshot::{FieldMap, ParticleData, Snapshot};
use crate::species::{FieldSelector, Species, SpeciesSelector};
use crate::writer::{set_file_count, validate_particles, write_container, write_shards};

/// Loads and stores snapshots through a container backend
pub struct SnapshotIo<B: ContainerBackend> {
    config: Config,
    backend: B,
}

impl SnapshotIo<FileBackend> {
    /// File-backed I/O with default config
    pub fn files() -> Self {
        Self::new(Config::default(), FileBackend)
    }
}

impl<B: ContainerBackend> SnapshotIo<B> {
    pub fn new(config: Config, backend: B) -> Self {
        Self { config, backend }
    }

    /// Default config over `backend`
    pub fn with_backend(backend: B) -> Self {
        Self::new(Config::default(), backend)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// File layout for a snapshot `base` split over `nfiles` containers
    pub fn layout(&self, base: impl AsRef<Path>, nfiles: usize) -> Result<ShardLayout> {
        let extension = self
            .config
            .extension
            .clone()
            .unwrap_or_else(|| self.backend.extension().to_string());
        ShardLayout::new(base, nfiles, extension)
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Load the selected species and fields of a snapshot
    ///
    /// Species with a zero total are left out of the result. For sharded
    /// snapshots the header is shard 0's, with `NumPart_Total` rebuilt when
    /// it was stored as zeros.
    pub fn load(
        &self,
        base: impl AsRef<Path>,
        nfiles: usize,
        species: impl Into<SpeciesSelector>,
        fields: impl Into<FieldSelector>,
    ) -> Result<Snapshot> {
        let layout = self.layout(base, nfiles)?;
        let species = species.into();
        let fields = fields.into();

        let snapshot = if layout.is_sharded() {
            self.load_sharded(&layout, &species, &fields)?
        } else {
            self.load_single(&layout, &species, &fields)?
        };

        info!(
            base = %layout.base().display(),
            nfiles,
            species = snapshot.particles.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Single file: copy selected fields as stored, no preallocation
    fn load_single(
        &self,
        layout: &ShardLayout,
        species: &SpeciesSelector,
        fields: &FieldSelector,
    ) -> Result<Snapshot> {
        with_container(&self.backend, &layout.single_path(), OpenMode::Read, |h| {
            let header = Header::from_attrs(h.read_attrs(HEADER_GROUP)?);
            let totals = header.particle_totals()?;

            let mut particles = ParticleData::new();
            for s in species.species() {
                if totals[s.index()] == 0 {
                    continue;
                }
                let group = s.group_name();
                let mut loaded = FieldMap::new();
                for name in h.dataset_names(&group)? {
                    if fields.includes(&name) {
                        let array = h.read_dataset(&group, &name)?;
                        loaded.insert(name, array);
                    }
                }
                particles.insert(s, loaded);
            }

            Ok(Snapshot::new(header, particles))
        })
    }

    /// Sharded: aggregate header, allocate from sample shards, fill in order
    fn load_sharded(
        &self,
        layout: &ShardLayout,
        species: &SpeciesSelector,
        fields: &FieldSelector,
    ) -> Result<Snapshot> {
        let header = aggregate_header(&self.backend, layout)?;
        let totals = header.particle_totals()?;

        let wanted: Vec<Species> = species
            .species()
            .into_iter()
            .filter(|s| totals[s.index()] > 0)
            .collect();
        if wanted.is_empty() {
            debug!("No selected species has particles");
            return Ok(Snapshot::new(header, ParticleData::new()));
        }

        for s in &wanted {
            debug!(species = %s, total = totals[s.index()], "Selected species");
        }

        let shard0 = header.num_part_this_file()?;
        let samples = select_sample_shards(
            &self.backend,
            layout,
            &shard0,
            &wanted,
            self.config.sample_shard,
        )?;

        let mut particles = ParticleData::new();
        for (index, group) in samples {
            with_container(&self.backend, &layout.shard_path(index), OpenMode::Read, |h| {
                for s in group {
                    let total = count_to_usize(totals[s.index()])?;
                    let allocated = allocate_fields(h, s, fields, total, self.config.allocation)?;
                    particles.insert(s, allocated);
                }
                Ok(())
            })?;
        }

        let filled = read_shards(&self.backend, layout, fields, &mut particles)?;
        for s in particles.keys() {
            if filled.get(*s) != totals[s.index()] {
                warn!(
                    species = %s,
                    filled = filled.get(*s),
                    total = totals[s.index()],
                    "Shards hold a different particle count than NumPart_Total"
                );
            }
        }

        Ok(Snapshot::new(header, particles))
    }

    // =========================================================================
    // Store
    // =========================================================================

    /// Store a snapshot as `nfiles` containers
    ///
    /// Species active in `header` (`NumPart_Total > 0`) are written; other
    /// entries of `particles` are ignored. On a sharded store each shard's
    /// `NumPart_ThisFile` is recomputed from its identifier-field chunk. A
    /// failure part-way leaves the shards written so far on disk.
    pub fn store(
        &self,
        base: impl AsRef<Path>,
        nfiles: usize,
        header: &Header,
        particles: &ParticleData,
    ) -> Result<()> {
        let layout = self.layout(base, nfiles)?;

        if layout.is_sharded() {
            write_shards(
                &self.backend,
                &layout,
                header,
                particles,
                &self.config.identifier_field,
            )?;
        } else {
            self.store_single(&layout, header, particles)?;
        }

        info!(
            base = %layout.base().display(),
            nfiles,
            total = count_sum(&header.particle_totals()?),
            "Stored snapshot"
        );
        Ok(())
    }

    /// Single file: whole arrays, `NumPart_ThisFile` set to the totals
    fn store_single(&self, layout: &ShardLayout, header: &Header, particles: &ParticleData) -> Result<()> {
        let totals = header.particle_totals()?;
        let active = header.active_species()?;
        validate_particles(&totals, &active, particles, None)?;

        let mut header = header.clone();
        set_file_count(&mut header, 1);
        header.set_num_part_this_file(&totals)?;

        with_container(&self.backend, &layout.single_path(), OpenMode::Write, |h| {
            write_container(h, &header, &active, particles, |_| None)
        })
    }
}

impl<B: ContainerBackend + Default> Default for SnapshotIo<B> {
    fn default() -> Self {
        Self::with_backend(B::default())
    }
}
