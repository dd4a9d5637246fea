//! Segment Module
//!
//! Presents a file larger than one mapping as a single addressable byte stream.
//!
//! ## Responsibilities
//! - Map a data file as an ordered array of bounded-size segments
//! - Translate a logical offset into (segment, offset-in-segment)
//! - Stitch reads that straddle segment boundaries
//!
//! ## Layout
//! ```text
//!  logical offset 0                                          len
//!  ├──────────── segment 0 ────────────┼──── segment 1 ────┼─ 2 ─┤
//!  │          segment_size             │   segment_size    │     │
//!  └───────────────────────────────────┴───────────────────┴─────┘
//! ```
//!
//! A reader is immutable once built. Growing or replacing the file means
//! building a new reader; holders of the old one keep a valid (stale) view.

mod cursor;
mod reader;

pub use cursor::SegmentCursor;
pub use reader::{MappedReader, SegmentedReader};
