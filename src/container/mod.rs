//! Container Module
//!
//! Hierarchical containers that shard files are stored in: named groups, each
//! with attributes and named datasets.
//!
//! ## Responsibilities
//! - Open/close a container at a path for reading or (truncating) writing
//! - Read and write group attributes
//! - Read and write datasets under a group
//!
//! Load/store code only talks to the [`ContainerBackend`] and
//! [`ContainerHandle`] traits. Two backends ship with the crate:
//! - [`MemoryBackend`]: containers held in a shared in-process map
//! - [`FileBackend`]: self-describing binary files (see `file.rs`)

mod file;
mod memory;
mod tree;

use std::path::Path;

use tracing::warn;

use crate::array::{Array, ElementKind, Shape};
use crate::error::Result;
use crate::header::Attributes;

pub use file::{FileBackend, FileContainer, FILE_EXTENSION};
pub use memory::{MemoryBackend, MemoryContainer};
pub use tree::{ContainerTree, Group};

/// Access mode for opening a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing container, read only
    Read,

    /// New container; an existing one at the path is truncated
    Write,
}

/// An open container
pub trait ContainerHandle {
    /// Path the container was opened at
    fn path(&self) -> &Path;

    fn has_group(&self, group: &str) -> bool;

    /// All attributes of `group`
    fn read_attrs(&self, group: &str) -> Result<Attributes>;

    /// Dataset names under `group`, sorted
    fn dataset_names(&self, group: &str) -> Result<Vec<String>>;

    /// Declared shape and element kind of a dataset, without copying it
    fn dataset_shape(&self, group: &str, name: &str) -> Result<(Shape, ElementKind)>;

    fn read_dataset(&self, group: &str, name: &str) -> Result<Array>;

    /// Create `group`; creating an existing group is a no-op
    fn create_group(&mut self, group: &str) -> Result<()>;

    /// Set attributes on an existing group, replacing same-named ones
    fn write_attrs(&mut self, group: &str, attrs: &Attributes) -> Result<()>;

    /// Add a dataset to an existing group
    fn write_dataset(&mut self, group: &str, name: &str, data: &Array) -> Result<()>;

    /// Release the container, persisting it if opened for writing
    fn close(self) -> Result<()>;
}

/// Opens containers
pub trait ContainerBackend {
    type Handle: ContainerHandle;

    /// File extension containers of this backend use, without the dot
    fn extension(&self) -> &str;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<Self::Handle>;
}

/// Open a container, run `f` on it and close it again
///
/// The handle is closed on both paths. When `f` fails the container is still
/// closed (a writer persists what it has so far) and `f`'s error is returned.
pub fn with_container<B, T, F>(backend: &B, path: &Path, mode: OpenMode, f: F) -> Result<T>
where
    B: ContainerBackend,
    F: FnOnce(&mut B::Handle) -> Result<T>,
{
    let mut handle = backend.open(path, mode)?;
    match f(&mut handle) {
        Ok(value) => {
            handle.close()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(close_err) = handle.close() {
                warn!(path = %path.display(), error = %close_err, "Failed to close container after error");
            }
            Err(e)
        }
    }
}
