//! Shard file layout
//!
//! Maps a snapshot base name and shard count onto container paths:
//! - single file: `{base}.{ext}`
//! - sharded:     `{base}.0.{ext}` … `{base}.{n-1}.{ext}`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, SnapshotError};

/// File naming for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLayout {
    base: PathBuf,
    nfiles: usize,
    extension: String,
}

impl ShardLayout {
    /// Layout for `nfiles` shards; `base` carries no extension
    pub fn new(base: impl AsRef<Path>, nfiles: usize, extension: impl Into<String>) -> Result<Self> {
        if nfiles == 0 {
            return Err(SnapshotError::InvalidArgument(
                "snapshot must span at least one file".to_string(),
            ));
        }
        Ok(Self {
            base: base.as_ref().to_path_buf(),
            nfiles,
            extension: extension.into(),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn nfiles(&self) -> usize {
        self.nfiles
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// True when the snapshot spans more than one file
    pub fn is_sharded(&self) -> bool {
        self.nfiles > 1
    }

    /// Path of the lone file of an unsharded snapshot
    pub fn single_path(&self) -> PathBuf {
        self.with_suffix(&format!(".{}", self.extension))
    }

    /// Path of shard `index`
    pub fn shard_path(&self, index: usize) -> PathBuf {
        self.with_suffix(&format!(".{}.{}", index, self.extension))
    }

    /// Every path this layout covers, in shard order
    pub fn paths(&self) -> Vec<PathBuf> {
        if self.is_sharded() {
            (0..self.nfiles).map(|i| self.shard_path(i)).collect()
        } else {
            vec![self.single_path()]
        }
    }

    /// Append to the file name (not `set_extension`: base names may contain dots)
    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.base.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }
}
