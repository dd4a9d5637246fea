//! Staging buffer
//!
//! Holds buffered writes until the next flush.

use std::collections::BTreeMap;

use crate::record::HEADER_SIZE;

/// A write waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedWrite {
    Put { value: Vec<u8>, timestamp: i64 },
    Delete { timestamp: i64 },
}

impl StagedWrite {
    /// Value bytes, or `None` for a staged delete
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            StagedWrite::Put { value, .. } => Some(value),
            StagedWrite::Delete { .. } => None,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            StagedWrite::Put { timestamp, .. } | StagedWrite::Delete { timestamp } => *timestamp,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, StagedWrite::Delete { .. })
    }

    /// Serialized size of the record this write becomes
    fn estimated_len(&self, key: &str) -> usize {
        HEADER_SIZE + key.len() + self.value().map_or(0, <[u8]>::len)
    }
}

/// Latest staged write per key plus the estimated size of the batch
#[derive(Debug, Default)]
pub struct StagingBuffer {
    writes: BTreeMap<String, StagedWrite>,
    size: usize,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write, replacing any earlier one for the same key
    pub fn stage(&mut self, key: &str, write: StagedWrite) {
        self.size += write.estimated_len(key);
        if let Some(previous) = self.writes.insert(key.to_string(), write) {
            self.size -= previous.estimated_len(key);
        }
    }

    /// Forget the staged write for `key`
    pub fn unstage(&mut self, key: &str) -> Option<StagedWrite> {
        let removed = self.writes.remove(key);
        if let Some(write) = &removed {
            self.size -= write.estimated_len(key);
        }
        removed
    }

    pub fn get(&self, key: &str) -> Option<&StagedWrite> {
        self.writes.get(key)
    }

    /// Staged writes in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StagedWrite)> {
        self.writes.iter().map(|(k, w)| (k.as_str(), w))
    }

    /// Estimated serialized size of the batch (bytes)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// True once the batch has grown past `limit`
    pub fn exceeds(&self, limit: usize) -> bool {
        self.size > limit
    }

    pub fn clear(&mut self) {
        self.writes.clear();
        self.size = 0;
    }
}
