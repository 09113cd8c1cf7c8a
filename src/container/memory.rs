//! In-memory containers
//!
//! Containers live in a map shared by every clone of a [`MemoryBackend`].
//! A write-mode handle replaces the entry with an empty tree when opened and
//! publishes its tree when closed, mirroring file truncation and flush.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::array::{Array, ElementKind, Shape};
use crate::error::{Result, SnapshotError};
use crate::header::Attributes;

use super::{ContainerBackend, ContainerHandle, ContainerTree, OpenMode};

/// Extension used for in-memory containers
const MEMORY_EXTENSION: &str = "mem";

/// Backend keeping containers in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    files: Arc<Mutex<HashMap<PathBuf, ContainerTree>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a container exists at `path`
    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    /// Number of containers held
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Container paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Copy of the container at `path`
    pub fn tree(&self, path: &Path) -> Option<ContainerTree> {
        self.files.lock().get(path).cloned()
    }

    /// Place a prepared container at `path`, replacing any existing one
    pub fn insert(&self, path: impl Into<PathBuf>, tree: ContainerTree) {
        self.files.lock().insert(path.into(), tree);
    }

    pub fn remove(&self, path: &Path) -> Option<ContainerTree> {
        self.files.lock().remove(path)
    }
}

impl ContainerBackend for MemoryBackend {
    type Handle = MemoryContainer;

    fn extension(&self) -> &str {
        MEMORY_EXTENSION
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<MemoryContainer> {
        let tree = match mode {
            OpenMode::Read => self.tree(path).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no container at {}", path.display()),
                )
            })?,
            OpenMode::Write => {
                self.insert(path, ContainerTree::new());
                ContainerTree::new()
            }
        };

        Ok(MemoryContainer {
            path: path.to_path_buf(),
            mode,
            tree,
            files: Arc::clone(&self.files),
        })
    }
}

/// Open in-memory container
pub struct MemoryContainer {
    path: PathBuf,
    mode: OpenMode,
    tree: ContainerTree,
    files: Arc<Mutex<HashMap<PathBuf, ContainerTree>>>,
}

impl MemoryContainer {
    fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            OpenMode::Write => Ok(()),
            OpenMode::Read => Err(SnapshotError::ReadOnly(self.path.display().to_string())),
        }
    }
}

impl ContainerHandle for MemoryContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_group(&self, group: &str) -> bool {
        self.tree.has_group(group)
    }

    fn read_attrs(&self, group: &str) -> Result<Attributes> {
        self.tree.read_attrs(group)
    }

    fn dataset_names(&self, group: &str) -> Result<Vec<String>> {
        self.tree.dataset_names(group)
    }

    fn dataset_shape(&self, group: &str, name: &str) -> Result<(Shape, ElementKind)> {
        self.tree.dataset_shape(group, name)
    }

    fn read_dataset(&self, group: &str, name: &str) -> Result<Array> {
        self.tree.read_dataset(group, name)
    }

    fn create_group(&mut self, group: &str) -> Result<()> {
        self.ensure_writable()?;
        self.tree.create_group(group);
        Ok(())
    }

    fn write_attrs(&mut self, group: &str, attrs: &Attributes) -> Result<()> {
        self.ensure_writable()?;
        self.tree.write_attrs(group, attrs)
    }

    fn write_dataset(&mut self, group: &str, name: &str, data: &Array) -> Result<()> {
        self.ensure_writable()?;
        self.tree.write_dataset(group, name, data)
    }

    fn close(self) -> Result<()> {
        if self.mode == OpenMode::Write {
            self.files.lock().insert(self.path, self.tree);
        }
        Ok(())
    }
}
