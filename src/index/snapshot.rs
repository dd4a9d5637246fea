//! Index snapshot encoding
//!
//! Reads and writes the `<bucket>.index` side file.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use bytes::{Buf, BufMut};

use crate::error::{DriftError, Result};
use crate::record::{HEADER_SIZE, MAX_KEY_LEN};

use super::IndexEntry;

/// Count (4)
const COUNT_SIZE: usize = 4;

/// CRC32 trailer (4)
const CRC_SIZE: usize = 4;

/// Smallest possible entry: KeyLen (1) + Timestamp (8) + Offset (8)
const MIN_ENTRY_SIZE: usize = 17;

/// Serialize entries: count + entries + crc32
pub(super) fn encode_snapshot(entries: &HashMap<String, IndexEntry>) -> Vec<u8> {
    let body: usize = entries.keys().map(|k| MIN_ENTRY_SIZE + k.len()).sum();
    let mut buf = Vec::with_capacity(COUNT_SIZE + body + CRC_SIZE);

    buf.put_u32(entries.len() as u32);
    for (key, entry) in entries {
        buf.put_u8(key.len() as u8);
        buf.put_slice(key.as_bytes());
        buf.put_i64(entry.timestamp);
        buf.put_u64(entry.offset);
    }

    let crc = crc32fast::hash(&buf);
    buf.put_u32(crc);
    buf
}

/// Parse a snapshot, checking every entry points inside a `data_len` byte log
pub(super) fn decode_snapshot(bytes: &[u8], data_len: u64) -> Result<HashMap<String, IndexEntry>> {
    if bytes.len() < COUNT_SIZE + CRC_SIZE {
        return Err(DriftError::Corruption(format!(
            "snapshot too short: {} bytes",
            bytes.len()
        )));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CRC_SIZE);
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(DriftError::Corruption(format!(
            "snapshot checksum mismatch: expected {:08x}, got {:08x}",
            expected, actual
        )));
    }

    let mut buf = body;
    let count = buf.get_u32() as usize;
    let mut entries = HashMap::with_capacity(count.min(buf.remaining() / MIN_ENTRY_SIZE));

    for i in 0..count {
        if buf.remaining() < 1 {
            return Err(DriftError::Corruption(format!("snapshot ends at entry {}", i)));
        }
        let key_len = usize::from(buf.get_u8());
        if key_len > MAX_KEY_LEN || buf.remaining() < key_len + 16 {
            return Err(DriftError::Corruption(format!(
                "snapshot entry {} is malformed",
                i
            )));
        }

        let key = String::from_utf8(buf[..key_len].to_vec()).map_err(|_| {
            DriftError::Corruption(format!("snapshot entry {} key is not UTF-8", i))
        })?;
        buf.advance(key_len);
        let timestamp = buf.get_i64();
        let offset = buf.get_u64();

        if offset.saturating_add(HEADER_SIZE as u64) > data_len {
            return Err(DriftError::Corruption(format!(
                "snapshot entry {} points at {} past data length {}",
                i, offset, data_len
            )));
        }

        entries.insert(key, IndexEntry::new(timestamp, offset));
    }

    if buf.has_remaining() {
        return Err(DriftError::Corruption(format!(
            "{} trailing bytes after snapshot entries",
            buf.remaining()
        )));
    }

    Ok(entries)
}

/// Read the snapshot at `path`; `Ok(None)` if there is none
pub(super) fn read_snapshot(path: &Path, data_len: u64) -> Result<Option<HashMap<String, IndexEntry>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    decode_snapshot(&bytes, data_len).map(Some)
}

/// Write the snapshot via a temp file + rename, forcing both to disk
pub(super) fn write_snapshot(path: &Path, entries: &HashMap<String, IndexEntry>) -> Result<()> {
    let bytes = encode_snapshot(entries);
    let tmp_path = path.with_extension("index.tmp");

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    if let Some(dir) = path.parent() {
        // Directory fsync is best effort; not every platform allows opening one.
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Remove the snapshot if present
pub(super) fn remove_snapshot(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
