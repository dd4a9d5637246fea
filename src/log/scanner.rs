//! Log Scanner
//!
//! Sequential, header-driven walk over a data file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{DriftError, Result};
use crate::record::{RecordHeader, HEADER_SIZE};

/// Location and identity of one complete record found by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Offset of the record's first header byte
    pub offset: u64,
    pub header: RecordHeader,
    pub key: String,
}

impl ScannedRecord {
    /// Offset one past the record's last byte
    pub fn end(&self) -> u64 {
        self.offset + self.header.record_len()
    }
}

/// Walks records from a start offset to the end of the file
///
/// The file length is captured at open; bytes appended later are not seen.
/// Values are skipped, not read.
pub struct LogScanner {
    reader: BufReader<File>,
    position: u64,
    len: u64,
    failed: bool,
}

impl LogScanner {
    /// Open `path` and position the scan at `start`
    pub fn open(path: &Path, start: u64) -> Result<Self> {
        Self::from_file(File::open(path)?, start)
    }

    pub fn from_file(mut file: File, start: u64) -> Result<Self> {
        let len = file.metadata()?.len();
        let start = start.min(len);
        file.seek(SeekFrom::Start(start))?;

        Ok(Self {
            reader: BufReader::new(file),
            position: start,
            len,
            failed: false,
        })
    }

    /// Offset of the next record to be read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// File length at open
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the next record
    ///
    /// Returns:
    /// - `Ok(Some(record))` — a complete record
    /// - `Ok(None)` — clean end of file
    /// - `Err(TruncatedRecord | Corruption)` — torn tail starting at `position()`
    pub fn next_record(&mut self) -> Result<Option<ScannedRecord>> {
        if self.position >= self.len {
            return Ok(None);
        }

        let offset = self.position;
        let available = self.len - offset;

        if available < HEADER_SIZE as u64 {
            return Err(DriftError::TruncatedRecord {
                offset,
                needed: HEADER_SIZE as u64,
                available,
            });
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header_bytes)?;
        let header = RecordHeader::decode(&header_bytes).map_err(|e| match e {
            DriftError::Corruption(msg) => {
                DriftError::Corruption(format!("{} at offset {}", msg, offset))
            }
            other => other,
        })?;

        if header.record_len() > available {
            return Err(DriftError::TruncatedRecord {
                offset,
                needed: header.record_len(),
                available,
            });
        }

        let mut key = vec![0u8; usize::from(header.key_len)];
        self.reader.read_exact(&mut key)?;
        let key = String::from_utf8(key).map_err(|_| {
            DriftError::Corruption(format!("key is not UTF-8 at offset {}", offset))
        })?;

        self.reader.seek_relative(i64::from(header.value_len))?;
        self.position = offset + header.record_len();

        Ok(Some(ScannedRecord {
            offset,
            header,
            key,
        }))
    }
}

impl Iterator for LogScanner {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
