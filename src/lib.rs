//! # snapshard
//!
//! Load and store particle simulation snapshots split across several files:
//! - Reassembles per-species field arrays from N shard files, in shard order
//! - Rebuilds `NumPart_Total` when shards only record per-file counts
//! - Splits an in-memory snapshot back into N near-equal shards with
//!   consistent per-shard `NumPart_ThisFile`
//! - Pluggable container backends (in-memory, binary files)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SnapshotIo                            │
//! │                  load(...)    store(...)                     │
//! └───────────┬─────────────────────────────────┬───────────────┘
//!             │ nfiles > 1                      │ nfiles > 1
//!             ▼                                 ▼
//!   ┌───────────────────┐               ┌───────────────────┐
//!   │ HeaderAggregator  │               │   ShardWriter     │
//!   │ (NumPart_Total)   │               │ (split + headers) │
//!   └─────────┬─────────┘               └─────────┬─────────┘
//!             ▼                                   │
//!   ┌───────────────────┐                         │
//!   │  ShapeInferrer    │                         │
//!   │ (sample shard)    │                         │
//!   └─────────┬─────────┘                         │
//!             ▼                                   │
//!   ┌───────────────────┐                         │
//!   │   ShardReader     │                         │
//!   │ (offset copies)   │                         │
//!   └─────────┬─────────┘                         │
//!             └──────────────┬────────────────────┘
//!                            ▼
//!                  ┌───────────────────┐
//!                  │    Containers     │
//!                  │ (memory / files)  │
//!                  └───────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use snapshard::{Species, SnapshotIo};
//!
//! let io = SnapshotIo::files();
//! let snapshot = io.load("output/snapshot_010", 4, Species::DARK_MATTER, "ParticleIDs")?;
//! io.store("rebinned/snapshot_010", 2, &snapshot.header, &snapshot.particles)?;
//! # Ok::<(), snapshard::SnapshotError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod array;
pub mod header;
pub mod species;
pub mod snapshot;
pub mod layout;
pub mod container;

pub mod aggregate;
pub mod shape;
pub mod reader;
pub mod writer;
pub mod snapshot_io;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use array::{Array, ArrayData, ElementKind, Shape};
pub use config::{AllocationKind, Config, SampleShard};
pub use container::{FileBackend, MemoryBackend};
pub use error::{Result, SnapshotError};
pub use header::{AttrValue, Attributes, Header, ParticleCounts};
pub use snapshot::{FieldMap, ParticleData, Snapshot};
pub use snapshot_io::SnapshotIo;
pub use species::{FieldSelector, Selection, Species, SpeciesSelector};

use std::path::Path;

// =============================================================================
// Convenience Functions
// =============================================================================

/// Load a file-backed snapshot with default config
pub fn load(
    base: impl AsRef<Path>,
    nfiles: usize,
    species: impl Into<SpeciesSelector>,
    fields: impl Into<FieldSelector>,
) -> Result<Snapshot> {
    SnapshotIo::files().load(base, nfiles, species, fields)
}

/// Store a file-backed snapshot with default config
pub fn store(
    base: impl AsRef<Path>,
    nfiles: usize,
    header: &Header,
    particles: &ParticleData,
) -> Result<()> {
    SnapshotIo::files().store(base, nfiles, header, particles)
}

// =============================================================================
// Version Info
// =============================================================================

/// Current version of snapshard
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
