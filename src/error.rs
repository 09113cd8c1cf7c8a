//! Error types for snapshard
//!
//! Provides a unified error type for all load/store operations.

use thiserror::Error;

/// Result type alias using SnapshotError
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Unified error type for snapshard operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Container Errors
    // -------------------------------------------------------------------------
    #[error("Container format error: {0}")]
    Format(String),

    #[error("Group not found: {0}")]
    MissingGroup(String),

    #[error("Dataset not found: {group}/{name}")]
    MissingDataset { group: String, name: String },

    #[error("Container not writable: {0}")]
    ReadOnly(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("There are no particles in NumPart_ThisFile or NumPart_Total")]
    EmptySnapshot,

    #[error("Shape inference failed: {0}")]
    ShapeInference(String),

    #[error("Particle count mismatch: {0}")]
    CountMismatch(String),
}

impl From<bincode::Error> for SnapshotError {
    fn from(e: bincode::Error) -> Self {
        SnapshotError::Serialization(e.to_string())
    }
}
