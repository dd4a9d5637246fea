//! Compaction
//!
//! Rewrites a bucket's data file keeping only the live record of each key.
//!
//! ## Phases
//! 1. Flush staged writes, then capture the index (writer mutex held, so the
//!    log cannot grow underneath the scan)
//! 2. Scan the old file and copy live records verbatim into `<name>.dat.compact`;
//!    lookups keep being served from the old mapping meanwhile
//! 3. Force the new file, open and map it, then swap under the exclusive guard:
//!    drop the old snapshot → rename → install log, index and mapping → save
//!
//! Everything that can fail runs before in-memory state changes, so a failed
//! swap leaves the bucket serving the old file. A failed snapshot save only
//! costs a full replay on the next open.
//!
//! A crash before the rename leaves the old file and its snapshot untouched.
//! A crash between snapshot removal and the new save leaves no snapshot, and
//! the next open replays the whole (already complete) file.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::index::IndexEntry;
use crate::log::{AppendLog, LogScanner};
use crate::segment::MappedReader;

use super::Bucket;

/// Extension appended to the data file name for the compaction target
const COMPACT_SUFFIX: &str = "compact";

/// Outcome of compacting one bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Records read from the old file
    pub records_scanned: u64,
    /// Records copied to the new file
    pub records_kept: u64,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl CompactionStats {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

impl Bucket {
    /// Drop superseded records and tombstones from the data file
    ///
    /// Every key live before the call resolves to the same value after it,
    /// and the file never grows.
    pub fn compact(&self) -> Result<CompactionStats> {
        self.check_writable()?;

        let mut writer = self.writer.lock();
        self.flush_locked(&mut writer)?;

        let live: HashMap<String, IndexEntry> = self.state.shared().index.entries().clone();
        let bytes_before = writer.log.position();
        let target_path = compaction_path(self.data_path());

        let (entries, mut stats) =
            match copy_live_records(self.data_path(), &target_path, &live, bytes_before) {
                Ok(result) => result,
                Err(e) => {
                    let _ = fs::remove_file(&target_path);
                    return Err(e);
                }
            };
        stats.bytes_before = bytes_before;

        if stats.records_kept == stats.records_scanned && stats.bytes_after == bytes_before {
            fs::remove_file(&target_path)?;
            tracing::debug!("Bucket {}: nothing to compact", self.name());
            return Ok(stats);
        }

        let (mut log, reader) = match self.open_compacted(&target_path) {
            Ok(prepared) => prepared,
            Err(e) => {
                let _ = fs::remove_file(&target_path);
                return Err(e);
            }
        };

        {
            let mut state = self.state.exclusive();

            let swapped = state
                .index
                .discard_snapshot()
                .and_then(|()| log.rename_to(self.data_path()));
            if let Err(e) = swapped {
                let _ = fs::remove_file(&target_path);
                return Err(e);
            }

            writer.log = log;
            state.index.replace(entries);
            state.reader = Arc::new(reader);

            if let Err(e) = state.index.save() {
                tracing::warn!(
                    "Bucket {}: index snapshot not written after compaction: {}",
                    self.name(),
                    e
                );
            }
        }

        tracing::info!(
            "Bucket {}: compacted {} → {} records, {} → {} bytes",
            self.name(),
            stats.records_scanned,
            stats.records_kept,
            stats.bytes_before,
            stats.bytes_after
        );

        Ok(stats)
    }

    /// Open and map the compacted file before it replaces the live one
    fn open_compacted(&self, target_path: &Path) -> Result<(AppendLog, MappedReader)> {
        let log = AppendLog::open(target_path)?;
        let reader = MappedReader::map(log.file(), log.position(), self.options.segment_size)?;
        Ok((log, reader))
    }
}

/// `<name>.dat` → `<name>.dat.compact`
fn compaction_path(data_path: &Path) -> PathBuf {
    let mut name = data_path.as_os_str().to_os_string();
    name.push(".");
    name.push(COMPACT_SUFFIX);
    PathBuf::from(name)
}

/// Copy every record whose offset matches its key's live entry
///
/// Returns the index for the new file. Only the first `len` bytes of the
/// source are considered.
fn copy_live_records(
    source_path: &Path,
    target_path: &Path,
    live: &HashMap<String, IndexEntry>,
    len: u64,
) -> Result<(HashMap<String, IndexEntry>, CompactionStats)> {
    let mut scanner = LogScanner::open(source_path, 0)?;
    let mut source = File::open(source_path)?;
    let mut target = BufWriter::new(
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(target_path)?,
    );

    let mut entries = HashMap::with_capacity(live.len());
    let mut stats = CompactionStats::default();
    let mut position = 0u64;

    loop {
        let record = match scanner.next_record() {
            Ok(Some(record)) if record.offset < len => record,
            Ok(_) => break,
            Err(e) if e.is_torn_record() => {
                tracing::warn!(
                    "Compaction of {} stopped at torn record: {}",
                    source_path.display(),
                    e
                );
                break;
            }
            Err(e) => return Err(e),
        };
        stats.records_scanned += 1;

        let is_live = live
            .get(&record.key)
            .is_some_and(|entry| entry.offset == record.offset);
        if !is_live {
            continue;
        }

        let record_len = record.header.record_len();
        source.seek(SeekFrom::Start(record.offset))?;
        let copied = io::copy(&mut (&mut source).take(record_len), &mut target)?;
        if copied != record_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "copied {} of {} bytes for record at {}",
                    copied, record_len, record.offset
                ),
            )
            .into());
        }

        entries.insert(
            record.key,
            IndexEntry::new(record.header.timestamp, position),
        );
        position += record_len;
        stats.records_kept += 1;
    }

    target.flush()?;
    let target = target.into_inner().map_err(|e| e.into_error())?;
    target.sync_all()?;

    stats.bytes_after = position;
    Ok((entries, stats))
}
