//! Configuration for DriftKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{DriftError, Result};

/// Largest value (and default segment capacity) a single mapping can address.
pub const MAX_SEGMENT_SIZE: u64 = i32::MAX as u64;

/// Main configuration for a DriftKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every bucket's files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {bucket}.dat     (append-only record log)
    ///     └── {bucket}.index   (index snapshot)
    pub data_dir: PathBuf,

    /// How puts reach the data log
    pub write_policy: WritePolicy,

    /// Capacity of one mapped segment (bytes)
    pub segment_size: u64,

    /// Largest accepted value (bytes)
    pub max_value_size: u32,

    /// Open existing buckets only and reject every mutation
    pub read_only: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Write policy for puts and deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Append + fsync + remap on every write (durable and visible immediately)
    Direct,

    /// Stage writes in memory and flush once the staged batch exceeds `limit` bytes
    Buffered { limit: usize },
}

impl Default for WritePolicy {
    fn default() -> Self {
        WritePolicy::Buffered { limit: 4096 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./driftkv_data"),
            write_policy: WritePolicy::default(),
            segment_size: MAX_SEGMENT_SIZE,
            max_value_size: MAX_SEGMENT_SIZE as u32,
            read_only: false,
            listen_addr: "127.0.0.1:7070".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.segment_size == 0 {
            return Err(DriftError::Config("segment_size must be > 0".to_string()));
        }
        if self.max_value_size == 0 {
            return Err(DriftError::Config("max_value_size must be > 0".to_string()));
        }
        if u64::from(self.max_value_size) > MAX_SEGMENT_SIZE {
            return Err(DriftError::Config(format!(
                "max_value_size {} exceeds {}",
                self.max_value_size, MAX_SEGMENT_SIZE
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all buckets)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the write policy
    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.config.write_policy = policy;
        self
    }

    /// Set the mapped segment capacity (in bytes)
    pub fn segment_size(mut self, size: u64) -> Self {
        self.config.segment_size = size;
        self
    }

    /// Set the largest accepted value (in bytes)
    pub fn max_value_size(mut self, size: u32) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Open the store read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
