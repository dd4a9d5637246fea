//! Log replay
//!
//! Rebuilds index state from the data log past a watermark.

use crate::error::{DriftError, Result};
use crate::log::LogScanner;

use super::{Index, IndexEntry};

/// What a replay saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Offset the scan started at
    pub start: u64,
    /// Offset one past the last complete record
    pub end: u64,
    /// Data file length when the scan began
    pub file_len: u64,
    /// Live records applied
    pub records: u64,
    /// Tombstones applied
    pub tombstones: u64,
    /// The scan stopped at a malformed record rather than a cut-short one
    pub corrupt: bool,
}

impl ReplayOutcome {
    /// True when bytes past `end` could not be decoded
    pub fn is_torn(&self) -> bool {
        self.end < self.file_len
    }

    /// Number of undecodable trailing bytes
    pub fn torn_bytes(&self) -> u64 {
        self.file_len - self.end
    }
}

impl Index {
    /// Apply every complete record from `position` onwards
    ///
    /// Records after the watermark always win over snapshot entries: a live
    /// record overwrites, a tombstone removes. The scan stops at EOF or at the
    /// first truncated or undecodable record; that tail is left out of the
    /// index and reported through `ReplayOutcome::is_torn`, with `corrupt`
    /// set when the stop was a malformed record.
    pub fn replay_from(&mut self, position: u64) -> Result<ReplayOutcome> {
        if !self.data_path().exists() {
            return Ok(ReplayOutcome::default());
        }

        let mut scanner = LogScanner::open(self.data_path(), position)?;
        let mut outcome = ReplayOutcome {
            start: scanner.position(),
            end: scanner.position(),
            file_len: scanner.len(),
            ..Default::default()
        };

        loop {
            match scanner.next_record() {
                Ok(Some(record)) => {
                    if record.header.deleted {
                        self.remove(&record.key);
                        outcome.tombstones += 1;
                    } else {
                        self.put(
                            record.key,
                            IndexEntry::new(record.header.timestamp, record.offset),
                        );
                        outcome.records += 1;
                    }
                    outcome.end = scanner.position();
                }
                Ok(None) => break,
                Err(e) if e.is_torn_record() => {
                    outcome.corrupt = matches!(e, DriftError::Corruption(_));
                    tracing::warn!(
                        "Stopping replay of {} at offset {}: {}",
                        self.data_path().display(),
                        outcome.end,
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(
            "Replayed {} records and {} tombstones from {} ({}..{})",
            outcome.records,
            outcome.tombstones,
            self.data_path().display(),
            outcome.start,
            outcome.end
        );

        Ok(outcome)
    }
}
