//! Index table
//!
//! The key → entry map and its snapshot persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::snapshot;
use super::ReplayOutcome;

/// Location of the live record for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Timestamp of the record
    pub timestamp: i64,
    /// Offset of the record's header in the data file
    pub offset: u64,
}

impl IndexEntry {
    pub fn new(timestamp: i64, offset: u64) -> Self {
        Self { timestamp, offset }
    }
}

/// Key → entry map backed by a data log and a snapshot file
pub struct Index {
    data_path: PathBuf,
    index_path: PathBuf,
    entries: HashMap<String, IndexEntry>,
}

impl Index {
    /// Empty index bound to the given files (nothing is read)
    pub fn new(data_path: &Path, index_path: &Path) -> Self {
        Self {
            data_path: data_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            entries: HashMap::new(),
        }
    }

    /// Build the index for a data file
    ///
    /// 1. Load the snapshot (if any) and take its largest offset as watermark
    /// 2. Replay the log from the watermark to the first torn record or EOF
    pub fn open(data_path: &Path, index_path: &Path) -> Result<(Self, ReplayOutcome)> {
        let mut index = Self::new(data_path, index_path);
        let watermark = index.load()?;
        let mut outcome = index.replay_from(watermark)?;

        // The record at the watermark itself is unreadable: the snapshot
        // describes a log that no longer exists. Start over from the log.
        if watermark > 0 && outcome.end == watermark && outcome.is_torn() {
            tracing::warn!(
                "Snapshot watermark {} of {} is not a readable record, replaying from 0",
                watermark,
                data_path.display()
            );
            index.clear();
            outcome = index.replay_from(0)?;
        }

        Ok((index, outcome))
    }

    // =========================================================================
    // Map operations
    // =========================================================================

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<IndexEntry> {
        self.entries.get(key).copied()
    }

    /// Insert or overwrite, returning the previous entry
    pub fn put(&mut self, key: impl Into<String>, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(key.into(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    /// All keys, unordered
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IndexEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Swap in a complete set of entries (after compaction)
    pub fn replace(&mut self, entries: HashMap<String, IndexEntry>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &HashMap<String, IndexEntry> {
        &self.entries
    }

    /// Largest offset held; replay can safely start here
    pub fn watermark(&self) -> u64 {
        self.entries.values().map(|e| e.offset).max().unwrap_or(0)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Replace the in-memory map with the snapshot's contents
    ///
    /// Returns the replay watermark. A missing snapshot yields 0; so does an
    /// unreadable one, after logging why it was discarded.
    pub fn load(&mut self) -> Result<u64> {
        self.entries.clear();

        let data_len = match std::fs::metadata(&self.data_path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        match snapshot::read_snapshot(&self.index_path, data_len) {
            Ok(Some(entries)) => {
                self.entries = entries;
                let watermark = self.watermark();
                tracing::debug!(
                    "Loaded {} index entries from {} (watermark {})",
                    self.entries.len(),
                    self.index_path.display(),
                    watermark
                );
                Ok(watermark)
            }
            Ok(None) => Ok(0),
            Err(e) => {
                tracing::warn!(
                    "Discarding index snapshot {}: {}",
                    self.index_path.display(),
                    e
                );
                Ok(0)
            }
        }
    }

    /// Write the full map to the snapshot file and force it to disk
    pub fn save(&self) -> Result<()> {
        snapshot::write_snapshot(&self.index_path, &self.entries)
    }

    /// Delete the snapshot file so the next open replays the whole log
    pub fn discard_snapshot(&self) -> Result<()> {
        snapshot::remove_snapshot(&self.index_path)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}
