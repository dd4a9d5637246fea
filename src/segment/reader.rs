//! Segmented Reader
//!
//! Logical byte stream over an ordered list of segments.

use std::borrow::Cow;
use std::fs::File;

use memmap2::{Mmap, MmapOptions};

use crate::error::{DriftError, Result};

use super::SegmentCursor;

/// Reader over memory-mapped segments of a data file
pub type MappedReader = SegmentedReader<Mmap>;

/// Ordered segments addressed as one stream
///
/// `S` is anything exposing bytes; production uses `Mmap`, tests can use `Vec<u8>`.
pub struct SegmentedReader<S> {
    segments: Vec<S>,
    /// Logical offset of the first byte of each segment
    starts: Vec<u64>,
    len: u64,
}

impl<S: AsRef<[u8]>> SegmentedReader<S> {
    /// Build a reader from already materialized segments
    ///
    /// Segments may have different sizes; empty ones are dropped.
    pub fn from_segments(segments: Vec<S>) -> Self {
        let segments: Vec<S> = segments
            .into_iter()
            .filter(|s| !s.as_ref().is_empty())
            .collect();

        let mut starts = Vec::with_capacity(segments.len());
        let mut len = 0u64;
        for segment in &segments {
            starts.push(len);
            len += segment.as_ref().len() as u64;
        }

        Self {
            segments,
            starts,
            len,
        }
    }

    /// Total addressable bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Read exactly `len` bytes at `offset`
    ///
    /// Borrows straight from the segment when the span fits in one, otherwise
    /// copies the pieces into an owned buffer. Never returns a partial span.
    pub fn read(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        self.check_span(offset, len as u64)?;

        if len == 0 {
            return Ok(Cow::Borrowed(&[]));
        }

        let (index, within) = self.locate(offset);
        let first = self.segments[index].as_ref();
        if within + len <= first.len() {
            return Ok(Cow::Borrowed(&first[within..within + len]));
        }

        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&first[within..]);
        let mut index = index + 1;
        while out.len() < len {
            let segment = self.segments[index].as_ref();
            let take = (len - out.len()).min(segment.len());
            out.extend_from_slice(&segment[..take]);
            index += 1;
        }

        Ok(Cow::Owned(out))
    }

    /// Sequential cursor starting at `offset`
    pub fn cursor(&self, offset: u64) -> SegmentCursor<'_, S> {
        SegmentCursor::new(self, offset)
    }

    /// Fail unless `[offset, offset + len)` lies inside the mapped extent
    pub(crate) fn check_span(&self, offset: u64, len: u64) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(DriftError::OutOfRange {
                offset,
                len,
                mapped: self.len,
            }),
        }
    }

    /// Map a logical offset (< len) to (segment index, offset within segment)
    fn locate(&self, offset: u64) -> (usize, usize) {
        let index = self.starts.partition_point(|&start| start <= offset) - 1;
        (index, (offset - self.starts[index]) as usize)
    }
}

impl SegmentedReader<Mmap> {
    /// Reader with nothing mapped (empty data file)
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            starts: Vec::new(),
            len: 0,
        }
    }

    /// Map the first `len` bytes of `file` in windows of `segment_size`
    pub fn map(file: &File, len: u64, segment_size: u64) -> Result<Self> {
        if segment_size == 0 {
            return Err(DriftError::Config("segment_size must be > 0".to_string()));
        }

        let mut segments = Vec::with_capacity(len.div_ceil(segment_size) as usize);
        let mut offset = 0u64;
        while offset < len {
            let size = segment_size.min(len - offset);
            // SAFETY: the data file is append-only while mapped. Bytes below
            // `len` are never rewritten in place; compaction replaces the file
            // by rename, which leaves existing mappings of the old inode valid.
            let mmap = unsafe {
                MmapOptions::new()
                    .offset(offset)
                    .len(size as usize)
                    .map(file)?
            };
            segments.push(mmap);
            offset += size;
        }

        Ok(Self::from_segments(segments))
    }
}
