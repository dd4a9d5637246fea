//! Bucket Module
//!
//! One independent namespace: a data log, its index and a mapped reader.
//!
//! ## Responsibilities
//! - Validate input and append records (directly or via a staging buffer)
//! - Keep the index in step with every applied append
//! - Remap the segmented reader after the data file grows or is replaced
//! - Serve point lookups through the current mapping
//! - Reclaim space from dead records (compaction)
//!
//! ## Locking
//! ```text
//!   writer: Mutex<WriterState>          put / delete / flush / compact
//!      │  (one mutation at a time per bucket; held across the whole op)
//!      ▼
//!   state: ConcurrencyGuard<BucketState>
//!      shared    → get / contains / timestamp / keys
//!      exclusive → index updates, staging changes, reader swaps
//! ```
//! Lock order is always writer → state.

mod compaction;
mod guard;
mod staging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Config, WritePolicy};
use crate::error::{DriftError, Result};
use crate::index::{Index, IndexEntry};
use crate::log::AppendLog;
use crate::record::{encode_record, now_millis, validate_entry, RecordHeader, HEADER_SIZE};
use crate::segment::MappedReader;

pub use compaction::CompactionStats;
pub use guard::ConcurrencyGuard;
pub use staging::{StagedWrite, StagingBuffer};

/// Extension of a bucket's data log
pub const DATA_EXTENSION: &str = "dat";

/// Extension of a bucket's index snapshot
pub const INDEX_EXTENSION: &str = "index";

/// Per-bucket settings derived from the store config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketOptions {
    pub write_policy: WritePolicy,
    pub segment_size: u64,
    pub max_value_size: u32,
    pub read_only: bool,
}

impl From<&Config> for BucketOptions {
    fn from(config: &Config) -> Self {
        Self {
            write_policy: config.write_policy,
            segment_size: config.segment_size,
            max_value_size: config.max_value_size,
            read_only: config.read_only,
        }
    }
}

impl Default for BucketOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Point-in-time numbers for one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketStats {
    pub name: String,
    pub live_keys: usize,
    pub staged_writes: usize,
    pub staged_bytes: usize,
    pub data_len: u64,
    pub segments: usize,
}

/// Append side of a bucket; only touched with the writer mutex held
struct WriterState {
    log: AppendLog,
    /// Last timestamp handed out; stamps never go backwards
    last_timestamp: i64,
}

impl WriterState {
    fn next_timestamp(&mut self) -> i64 {
        self.last_timestamp = self.last_timestamp.max(now_millis());
        self.last_timestamp
    }
}

/// State lookups read; guarded by the bucket's `ConcurrencyGuard`
struct BucketState {
    index: Index,
    reader: Arc<MappedReader>,
    staging: StagingBuffer,
}

/// A single namespace of keys backed by `<name>.dat` and `<name>.index`
pub struct Bucket {
    name: String,
    data_path: PathBuf,
    index_path: PathBuf,
    options: BucketOptions,
    writer: Mutex<WriterState>,
    state: ConcurrencyGuard<BucketState>,
}

impl Bucket {
    /// Open or create the bucket `name` inside `dir`
    ///
    /// On open:
    /// 1. Open the data log (created if absent, unless read-only)
    /// 2. Build the index: snapshot + log tail replay
    /// 3. Cut off a torn tail left by a crash mid-append (writable only);
    ///    a malformed record fails a writable open instead of being cut
    /// 4. Map the data file
    pub fn open(dir: &Path, name: &str, options: BucketOptions) -> Result<Self> {
        validate_bucket_name(name)?;

        let data_path = dir.join(format!("{}.{}", name, DATA_EXTENSION));
        let index_path = dir.join(format!("{}.{}", name, INDEX_EXTENSION));

        let mut log = if options.read_only {
            AppendLog::open_read_only(&data_path)?
        } else {
            AppendLog::open(&data_path)?
        };

        let (index, outcome) = Index::open(&data_path, &index_path)?;

        if outcome.is_torn() && outcome.corrupt {
            tracing::error!(
                "Bucket {}: corrupt record at offset {}, {} bytes from there on are unreadable",
                name,
                outcome.end,
                outcome.torn_bytes()
            );
            if !options.read_only {
                return Err(DriftError::Corruption(format!(
                    "bucket {} has a corrupt record at offset {} ({} bytes follow); \
                     open it read-only to recover the readable records",
                    name,
                    outcome.end,
                    outcome.torn_bytes()
                )));
            }
        } else if outcome.is_torn() && !options.read_only {
            tracing::warn!(
                "Bucket {}: dropping {} bytes of incomplete records after offset {}",
                name,
                outcome.torn_bytes(),
                outcome.end
            );
            log.truncate(outcome.end)?;
        }

        let reader = MappedReader::map(log.file(), log.position(), options.segment_size)?;
        let last_timestamp = index.iter().map(|(_, e)| e.timestamp).max().unwrap_or(0);

        tracing::debug!(
            "Opened bucket {} ({} keys, {} bytes, {} segments)",
            name,
            index.len(),
            log.position(),
            reader.segment_count()
        );

        Ok(Self {
            name: name.to_string(),
            data_path,
            index_path,
            options,
            writer: Mutex::new(WriterState {
                log,
                last_timestamp,
            }),
            state: ConcurrencyGuard::new(BucketState {
                index,
                reader: Arc::new(reader),
                staging: StagingBuffer::new(),
            }),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value stored for `key`
    ///
    /// Returns:
    /// - `Ok(Some(value))` — live value (staged writes are seen first)
    /// - `Ok(None)` — never written, or deleted
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let (entry, reader) = {
            let state = self.state.shared();

            if let Some(staged) = state.staging.get(key) {
                return Ok(staged.value().map(<[u8]>::to_vec));
            }

            match state.index.get(key) {
                Some(entry) => (entry, Arc::clone(&state.reader)),
                None => return Ok(None),
            }
        };

        read_value(&reader, entry.offset)
    }

    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.shared();
        match state.staging.get(key) {
            Some(staged) => !staged.is_delete(),
            None => state.index.contains(key),
        }
    }

    /// Timestamp (epoch millis) of the live value for `key`
    pub fn timestamp(&self, key: &str) -> Option<i64> {
        let state = self.state.shared();
        match state.staging.get(key) {
            Some(StagedWrite::Put { timestamp, .. }) => Some(*timestamp),
            Some(StagedWrite::Delete { .. }) => None,
            None => state.index.get(key).map(|e| e.timestamp),
        }
    }

    /// Live keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.shared();

        let mut keys: Vec<String> = state
            .index
            .keys()
            .filter(|k| state.staging.get(k).is_none())
            .map(str::to_string)
            .collect();
        keys.extend(
            state
                .staging
                .iter()
                .filter(|(_, w)| !w.is_delete())
                .map(|(k, _)| k.to_string()),
        );

        keys.sort();
        keys
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let state = self.state.shared();

        let mut count = state.index.len();
        for (key, write) in state.staging.iter() {
            match (state.index.contains(key), write.is_delete()) {
                (false, false) => count += 1,
                (true, true) => count -= 1,
                _ => {}
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Put a key-value pair
    ///
    /// Lengths are validated before any I/O. Under `WritePolicy::Direct` the
    /// record is durable and visible on return; under `Buffered` it is staged
    /// and the batch flushed once it outgrows the limit.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.check_writable()?;
        validate_entry(key, value.len(), self.options.max_value_size)?;

        let mut writer = self.writer.lock();
        let timestamp = writer.next_timestamp();

        match self.options.write_policy {
            WritePolicy::Direct => {
                let bytes = encode_record(key, value, false, timestamp)?;
                let offset = writer.log.append(&bytes)?;
                writer.log.force()?;

                let reader = self.map_current(&writer)?;
                let mut state = self.state.exclusive();
                state.index.put(key, IndexEntry::new(timestamp, offset));
                state.reader = Arc::new(reader);
                Ok(())
            }
            WritePolicy::Buffered { limit } => {
                let full = {
                    let mut state = self.state.exclusive();
                    state.staging.stage(
                        key,
                        StagedWrite::Put {
                            value: value.to_vec(),
                            timestamp,
                        },
                    );
                    state.staging.exceeds(limit)
                };

                if full {
                    self.flush_locked(&mut writer)?;
                }
                Ok(())
            }
        }
    }

    /// Delete a key by appending a tombstone
    ///
    /// Returns whether a live value was removed. Deleting an absent key writes
    /// nothing.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.check_writable()?;
        validate_entry(key, 0, self.options.max_value_size)?;

        let mut writer = self.writer.lock();

        match self.options.write_policy {
            WritePolicy::Direct => {
                if !self.state.shared().index.contains(key) {
                    return Ok(false);
                }

                let timestamp = writer.next_timestamp();
                let bytes = encode_record(key, &[], true, timestamp)?;
                writer.log.append(&bytes)?;
                writer.log.force()?;

                // Only after the tombstone is durable; replay reaches the same state.
                let reader = self.map_current(&writer)?;
                let mut state = self.state.exclusive();
                state.index.remove(key);
                state.reader = Arc::new(reader);
                Ok(true)
            }
            WritePolicy::Buffered { limit } => {
                let timestamp = writer.next_timestamp();
                let (existed, full) = {
                    let mut state = self.state.exclusive();
                    let on_disk = state.index.contains(key);
                    let existed = match state.staging.get(key) {
                        Some(staged) => !staged.is_delete(),
                        None => on_disk,
                    };

                    // Nothing on disk to shadow: dropping the staged put is enough.
                    if on_disk {
                        state.staging.stage(key, StagedWrite::Delete { timestamp });
                    } else {
                        state.staging.unstage(key);
                    }

                    (existed, state.staging.exceeds(limit))
                };

                if full {
                    self.flush_locked(&mut writer)?;
                }
                Ok(existed)
            }
        }
    }

    /// Append every staged write, force once, update and save the index, remap
    pub fn flush(&self) -> Result<()> {
        if self.options.read_only {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        self.flush_locked(&mut writer)
    }

    /// Rebuild the segmented reader against the current file length
    pub fn remap(&self) -> Result<()> {
        let writer = self.writer.lock();
        let reader = self.map_current(&writer)?;
        self.state.exclusive().reader = Arc::new(reader);
        Ok(())
    }

    /// Flush staged writes and persist the index snapshot
    pub fn close(&self) -> Result<()> {
        if self.options.read_only {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        self.flush_locked(&mut writer)?;
        self.state.shared().index.save()?;
        writer.log.force()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn options(&self) -> BucketOptions {
        self.options
    }

    pub fn stats(&self) -> BucketStats {
        let live_keys = self.len();
        let state = self.state.shared();
        BucketStats {
            name: self.name.clone(),
            live_keys,
            staged_writes: state.staging.len(),
            staged_bytes: state.staging.size(),
            data_len: state.reader.len(),
            segments: state.reader.segment_count(),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_writable(&self) -> Result<()> {
        if self.options.read_only {
            return Err(DriftError::ReadOnly(format!(
                "bucket {} was opened read-only",
                self.name
            )));
        }
        Ok(())
    }

    /// Map the data file as it stands now (writer mutex held by caller)
    fn map_current(&self, writer: &WriterState) -> Result<MappedReader> {
        MappedReader::map(
            writer.log.file(),
            writer.log.position(),
            self.options.segment_size,
        )
    }

    /// Flush implementation (writer mutex held by caller)
    ///
    /// Staged writes stay visible through the staging buffer until the index
    /// and reader have been swapped, so a concurrent `get` never misses them.
    fn flush_locked(&self, writer: &mut WriterState) -> Result<()> {
        let batch: Vec<(String, StagedWrite)> = {
            let state = self.state.shared();
            if state.staging.is_empty() {
                return Ok(());
            }
            state
                .staging
                .iter()
                .map(|(k, w)| (k.to_string(), w.clone()))
                .collect()
        };

        let mut applied = Vec::with_capacity(batch.len());
        for (key, write) in &batch {
            let bytes = encode_record(
                key,
                write.value().unwrap_or(&[]),
                write.is_delete(),
                write.timestamp(),
            )?;
            let offset = writer.log.append(&bytes)?;
            applied.push(offset);
        }
        writer.log.force()?;

        let reader = self.map_current(writer)?;
        {
            let mut state = self.state.exclusive();
            for ((key, write), offset) in batch.iter().zip(applied) {
                if write.is_delete() {
                    state.index.remove(key);
                } else {
                    state
                        .index
                        .put(key.as_str(), IndexEntry::new(write.timestamp(), offset));
                }
            }
            state.staging.clear();
            state.reader = Arc::new(reader);
        }

        self.state.shared().index.save()?;

        tracing::debug!(
            "Bucket {}: flushed {} staged writes ({} bytes on disk)",
            self.name,
            batch.len(),
            writer.log.position()
        );

        Ok(())
    }
}

/// Read the value of the record starting at `offset`
///
/// A tombstone yields `None`.
fn read_value(reader: &MappedReader, offset: u64) -> Result<Option<Vec<u8>>> {
    let mut cursor = reader.cursor(offset);
    let header = RecordHeader::decode(&cursor.read_bytes(HEADER_SIZE)?)?;

    if header.deleted {
        return Ok(None);
    }

    cursor.skip(u64::from(header.key_len))?;
    let value = cursor.read_bytes(header.value_len as usize)?;
    Ok(Some(value.into_owned()))
}

/// Bucket names become file names: non-empty, no separators, no leading dot
pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DriftError::Validation("Bucket name is empty".to_string()));
    }
    if name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(DriftError::Validation(format!(
            "Invalid bucket name: {:?}",
            name
        )));
    }
    Ok(())
}
