//! Segment Cursor
//!
//! Sequential reads over a `SegmentedReader`.

use std::borrow::Cow;

use crate::error::Result;

use super::SegmentedReader;

/// A position within a segmented stream that advances as it reads
pub struct SegmentCursor<'a, S> {
    reader: &'a SegmentedReader<S>,
    position: u64,
}

impl<'a, S: AsRef<[u8]>> SegmentCursor<'a, S> {
    pub(super) fn new(reader: &'a SegmentedReader<S>, position: u64) -> Self {
        Self { reader, position }
    }

    /// Current logical offset
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Jump to an absolute offset
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Bytes left between the cursor and the end of the mapped extent
    pub fn remaining(&self) -> u64 {
        self.reader.len().saturating_sub(self.position)
    }

    /// Advance without reading; fails if that would run past the extent
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.reader.check_span(self.position, count)?;
        self.position += count;
        Ok(())
    }

    /// Read `len` bytes and advance past them
    pub fn read_bytes(&mut self, len: usize) -> Result<Cow<'a, [u8]>> {
        let bytes = self.reader.read(self.position, len)?;
        self.position += len as u64;
        Ok(bytes)
    }
}
