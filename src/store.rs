//! Store Module
//!
//! Registry of buckets under one data directory.
//!
//! ## Responsibilities
//! - Discover existing buckets (`*.dat` files) on open
//! - Create buckets lazily on first write
//! - Route bucket-qualified calls to the right bucket
//! - Fan out store-wide operations (size, keys, flush, compact, close)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bucket::{Bucket, BucketOptions, CompactionStats, DATA_EXTENSION};
use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::protocol::{Command, Reply};

/// The composition root: name → bucket
///
/// ## Concurrency:
/// - `buckets`: RwLock over the map only; bucket operations run on an
///   `Arc<Bucket>` clone after the map lock is released
/// - Buckets are independent; different buckets never block each other
pub struct Store {
    config: Config,
    options: BucketOptions,
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
}

impl Store {
    /// Open or create a store in `config.data_dir`
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create the data directory (writable stores only)
    /// 3. Open a bucket for every `*.dat` file found
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        if !config.read_only {
            fs::create_dir_all(&config.data_dir)?;
        }
        if !config.data_dir.is_dir() {
            return Err(DriftError::Config(format!(
                "Not a directory: {}",
                config.data_dir.display()
            )));
        }

        let options = BucketOptions::from(&config);
        let mut buckets = HashMap::new();

        for name in discover_buckets(&config.data_dir)? {
            let bucket = Bucket::open(&config.data_dir, &name, options)?;
            buckets.insert(name, Arc::new(bucket));
        }

        tracing::info!(
            "Opened store at {} with {} buckets{}",
            config.data_dir.display(),
            buckets.len(),
            if config.read_only { " (read-only)" } else { "" }
        );

        Ok(Self {
            config,
            options,
            buckets: RwLock::new(buckets),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Execute a protocol command
    pub fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Get { bucket, key } => Ok(match self.get(&bucket, &key)? {
                Some(value) => Reply::Value(value),
                None => Reply::Missing,
            }),
            Command::Put { bucket, key, value } => {
                self.put(&bucket, &key, &value)?;
                Ok(Reply::Done)
            }
            Command::Delete { bucket, key } => Ok(Reply::Flag(self.delete(&bucket, &key)?)),
            Command::Contains { bucket, key } => Ok(Reply::Flag(self.contains(&bucket, &key))),
            Command::Timestamp { bucket, key } => Ok(match self.timestamp(&bucket, &key) {
                Some(ts) => Reply::Number(ts),
                None => Reply::Missing,
            }),
            Command::Keys { bucket } => Ok(Reply::Keys(self.keys(bucket.as_deref()))),
            Command::Size => Ok(Reply::Number(self.size() as i64)),
            Command::Compact { bucket } => {
                self.compact(bucket.as_deref())?;
                Ok(Reply::Done)
            }
            Command::Flush => {
                self.flush()?;
                Ok(Reply::Done)
            }
            Command::Ping => Ok(Reply::Pong),
        }
    }

    // =========================================================================
    // Per-key operations
    // =========================================================================

    /// Get a value; an unknown bucket is a miss
    pub fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        match self.lookup(bucket) {
            Some(b) => b.get(key),
            None => Ok(None),
        }
    }

    /// Put a value, creating the bucket if needed
    pub fn put(&self, bucket: &str, key: &str, value: &[u8]) -> Result<()> {
        self.bucket(bucket)?.put(key, value)
    }

    /// Delete a key; returns whether a live value was removed
    pub fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        if self.config.read_only {
            return Err(DriftError::ReadOnly("delete".to_string()));
        }
        match self.lookup(bucket) {
            Some(b) => b.delete(key),
            None => Ok(false),
        }
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lookup(bucket).is_some_and(|b| b.contains(key))
    }

    /// Timestamp (epoch millis) of the live value
    pub fn timestamp(&self, bucket: &str, key: &str) -> Option<i64> {
        self.lookup(bucket).and_then(|b| b.timestamp(key))
    }

    // =========================================================================
    // Store-wide operations
    // =========================================================================

    /// Sorted `"bucket/key"` strings for one bucket, or for all of them
    pub fn keys(&self, bucket: Option<&str>) -> Vec<String> {
        let buckets = self.buckets_matching(bucket);

        let mut keys: Vec<String> = buckets
            .iter()
            .flat_map(|b| {
                b.keys()
                    .into_iter()
                    .map(move |k| format!("{}/{}", b.name(), k))
            })
            .collect();
        keys.sort();
        keys
    }

    /// Total live keys across all buckets
    pub fn size(&self) -> usize {
        self.buckets.read().values().map(|b| b.len()).sum()
    }

    /// Compact one bucket, or every bucket
    ///
    /// Returns per-bucket stats in name order. Naming an unknown bucket is a no-op.
    pub fn compact(&self, bucket: Option<&str>) -> Result<Vec<(String, CompactionStats)>> {
        if self.config.read_only {
            return Err(DriftError::ReadOnly("compact".to_string()));
        }

        let mut results = Vec::new();
        for b in self.buckets_matching(bucket) {
            let stats = b.compact()?;
            results.push((b.name().to_string(), stats));
        }
        Ok(results)
    }

    /// Flush staged writes in every bucket
    pub fn flush(&self) -> Result<()> {
        if self.config.read_only {
            return Err(DriftError::ReadOnly("flush".to_string()));
        }
        for b in self.buckets_matching(None) {
            b.flush()?;
        }
        Ok(())
    }

    /// Close the store gracefully
    ///
    /// Flushes staged writes and saves every index snapshot.
    pub fn close(self) -> Result<()> {
        for b in self.buckets_matching(None) {
            b.close()?;
        }
        Ok(())
    }

    // =========================================================================
    // Bucket registry
    // =========================================================================

    /// Get a bucket, creating it on first access
    pub fn bucket(&self, name: &str) -> Result<Arc<Bucket>> {
        if let Some(b) = self.lookup(name) {
            return Ok(b);
        }
        if self.config.read_only {
            return Err(DriftError::ReadOnly(format!(
                "cannot create bucket {}",
                name
            )));
        }

        let mut buckets = self.buckets.write();
        // Another thread may have created it while we waited for the lock.
        if let Some(b) = buckets.get(name) {
            return Ok(Arc::clone(b));
        }

        let bucket = Arc::new(Bucket::open(&self.config.data_dir, name, self.options)?);
        tracing::debug!("Created bucket {}", name);
        buckets.insert(name.to_string(), Arc::clone(&bucket));
        Ok(bucket)
    }

    /// Existing bucket by name
    pub fn lookup(&self, name: &str) -> Option<Arc<Bucket>> {
        self.buckets.read().get(name).cloned()
    }

    /// Bucket names, sorted
    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Snapshot of the selected buckets, in name order, without holding the map lock
    fn buckets_matching(&self, name: Option<&str>) -> Vec<Arc<Bucket>> {
        let buckets = self.buckets.read();
        let mut selected: Vec<Arc<Bucket>> = match name {
            Some(name) => buckets.get(name).cloned().into_iter().collect(),
            None => buckets.values().cloned().collect(),
        };
        selected.sort_by(|a, b| a.name().cmp(b.name()));
        selected
    }
}

/// Bucket names for every `*.dat` file in `dir`
fn discover_buckets(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path: PathBuf = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(DATA_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if crate::bucket::validate_bucket_name(stem).is_ok() {
                names.push(stem.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}
