//! File containers
//!
//! One container per file. The whole tree is decoded on open and encoded on
//! close; shard files are read or written in a single pass.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "GZSC" (4) | Version: u16 (2) | BodyLen: u64 (8)│
//! ├─────────────────────────────────────────────────────────┤
//! │ Body (BodyLen bytes)                                    │
//! │   bincode-encoded ContainerTree                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                        │
//! │   BodyCRC: u32 (4) | Padding (4)                        │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::array::{Array, ElementKind, Shape};
use crate::error::{Result, SnapshotError};
use crate::header::Attributes;

use super::{ContainerBackend, ContainerHandle, ContainerTree, OpenMode};

/// Extension of container files
pub const FILE_EXTENSION: &str = "gzc";

/// Magic bytes identifying a container file
const MAGIC: &[u8; 4] = b"GZSC";

/// Current container format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + BodyLen (8) = 14 bytes
const HEADER_SIZE: usize = 14;

/// Footer size: BodyCRC (4) + Padding (4) = 8 bytes
const FOOTER_SIZE: usize = 8;

/// Backend storing each container in its own file
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBackend;

impl FileBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerBackend for FileBackend {
    type Handle = FileContainer;

    fn extension(&self) -> &str {
        FILE_EXTENSION
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<FileContainer> {
        match mode {
            OpenMode::Read => FileContainer::open(path),
            OpenMode::Write => FileContainer::create(path),
        }
    }
}

/// Open container file
pub struct FileContainer {
    path: PathBuf,
    tree: ContainerTree,
    /// Output file, present only in write mode
    file: Option<File>,
}

impl FileContainer {
    /// Open and fully decode an existing container file
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let tree = decode(&bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Opened container");

        Ok(Self {
            path: path.to_path_buf(),
            tree,
            file: None,
        })
    }

    /// Create (or truncate) a container file for writing
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            tree: ContainerTree::new(),
            file: Some(file),
        })
    }

    /// Decoded tree
    pub fn tree(&self) -> &ContainerTree {
        &self.tree
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.file.is_some() {
            Ok(())
        } else {
            Err(SnapshotError::ReadOnly(self.path.display().to_string()))
        }
    }
}

impl ContainerHandle for FileContainer {
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
        let file = match self.file {
            Some(file) => file,
            None => return Ok(()),
        };

        let body = bincode::serialize(&self.tree)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body);
        let body_crc = hasher.finalize();

        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(body.len() as u64).to_le_bytes())?;
        writer.write_all(&body)?;
        writer.write_all(&body_crc.to_le_bytes())?;
        writer.write_all(&[0u8; 4])?; // Padding for alignment
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| {
            SnapshotError::Format(format!("Failed to flush container: {}", e))
        })?;
        file.sync_all()?;

        debug!(path = %self.path.display(), bytes = body.len() + HEADER_SIZE + FOOTER_SIZE, "Wrote container");
        Ok(())
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[at..at + 2]);
    u16::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Validate framing and checksum, then decode the tree
fn decode(bytes: &[u8]) -> Result<ContainerTree> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(SnapshotError::Format(format!(
            "Container too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(SnapshotError::Format(format!(
            "Invalid container magic: expected GZSC, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = read_u16(bytes, 4);
    if version != VERSION {
        return Err(SnapshotError::Format(format!(
            "Unsupported container version: {}",
            version
        )));
    }

    // Compare against the space actually present; a corrupt BodyLen may be huge
    let body_len = read_u64(bytes, 6);
    let available = (bytes.len() - HEADER_SIZE - FOOTER_SIZE) as u64;
    if body_len != available {
        return Err(SnapshotError::Format(format!(
            "Container length mismatch: header says {} body bytes, file has {}",
            body_len, available
        )));
    }

    let body_end = bytes.len() - FOOTER_SIZE;
    let body = &bytes[HEADER_SIZE..body_end];
    let stored_crc = read_u32(bytes, body_end);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    let actual_crc = hasher.finalize();
    if stored_crc != actual_crc {
        return Err(SnapshotError::Format(format!(
            "Container checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    let tree: ContainerTree = bincode::deserialize(body)?;
    tree.validate()?;
    Ok(tree)
}
