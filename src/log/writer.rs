//! Append Log writer
//!
//! Sequential appends to a bucket's data file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{DriftError, Result};

/// Appends records to the end of a data file
///
/// `position` always equals the file length outside of an in-flight append.
/// A writable log holds an exclusive OS lock on its file for its whole
/// lifetime; read-only logs hold a shared one.
pub struct AppendLog {
    path: PathBuf,
    file: File,
    position: u64,
}

impl AppendLog {
    /// Open or create a data file for appending
    ///
    /// Fails with `DriftError::Locked` if another log already holds the file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| DriftError::Locked(path.display().to_string()))?;
        let position = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            position,
        })
    }

    /// Open an existing data file without write access
    ///
    /// Appends on such a log fail at the OS level; callers gate writes first.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        file.try_lock_shared()
            .map_err(|_| DriftError::Locked(path.display().to_string()))?;
        let position = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            position,
        })
    }

    /// Append one encoded record, returning the offset it starts at
    ///
    /// On a failed write the file is cut back to the pre-append length so the
    /// log never keeps a half-written record it knows about.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.position;

        if let Err(e) = self.file.write_all(bytes) {
            if let Err(rollback) = self.file.set_len(offset) {
                tracing::warn!(
                    "Failed to roll back partial append to {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }

        self.position += bytes.len() as u64;
        Ok(offset)
    }

    /// Flush written data to stable storage
    pub fn force(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Drop everything past `len` (torn-tail repair)
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.position = len;
        Ok(())
    }

    /// Move the data file to `path`, keeping the open handle and its lock
    pub fn rename_to(&mut self, path: &Path) -> Result<()> {
        fs::rename(&self.path, path)?;
        self.path = path.to_path_buf();
        Ok(())
    }

    /// Current end-of-file offset
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Underlying handle (used to build mappings)
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
