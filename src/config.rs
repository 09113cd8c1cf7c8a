//! Configuration for snapshard
//!
//! Centralized configuration with sensible defaults.

/// Default canonical identifier field
pub const DEFAULT_IDENTIFIER_FIELD: &str = "ParticleIDs";

/// Main configuration for load/store calls
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Field whose chunk lengths define `NumPart_ThisFile` on sharded writes
    pub identifier_field: String,

    /// File extension override; `None` uses the container backend's own.
    /// Shard files are named `{base}.{i}.{ext}`, single files `{base}.{ext}`.
    pub extension: Option<String>,

    // -------------------------------------------------------------------------
    // Reassembly Configuration
    // -------------------------------------------------------------------------
    /// Which shard supplies field shapes for a species
    pub sample_shard: SampleShard,

    /// Element kind of the arrays allocated for sharded loads
    pub allocation: AllocationKind,
}

/// Sample shard selection for shape inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShard {
    /// First shard, in ascending order, holding particles of the species
    FirstNonEmpty,

    /// Always shard 0; fails if it has no group for the species
    FirstOnly,
}

/// Element kind used when allocating global arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    /// Always f64, whatever the stored kind (identifiers included)
    Widened,

    /// The sample shard's stored kind
    Native,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
            extension: None,
            sample_shard: SampleShard::FirstNonEmpty,
            allocation: AllocationKind::Widened,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the canonical identifier field
    pub fn identifier_field(mut self, name: impl Into<String>) -> Self {
        self.config.identifier_field = name.into();
        self
    }

    /// Override the container file extension
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.config.extension = Some(ext.into());
        self
    }

    /// Set the sample shard policy
    pub fn sample_shard(mut self, policy: SampleShard) -> Self {
        self.config.sample_shard = policy;
        self
    }

    /// Set the allocation element kind
    pub fn allocation(mut self, kind: AllocationKind) -> Self {
        self.config.allocation = kind;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
