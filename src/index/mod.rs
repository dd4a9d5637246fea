//! Index Module
//!
//! In-memory key → (timestamp, offset) map for one bucket.
//!
//! ## Responsibilities
//! - Point lookups for the live record of each key
//! - Persist a snapshot to `<bucket>.index` (full rewrite, forced)
//! - Rebuild on open: load the snapshot, then replay the log tail
//!
//! ## Snapshot Format (big-endian)
//! ```text
//! ┌───────────┬──────────────────────────────────────────────┬───────────┐
//! │ Count (4) │ [KeyLen (1)][Key][Timestamp (8)][Offset (8)] │ CRC32 (4) │
//! │           │ ... repeated Count times ...                  │           │
//! └───────────┴──────────────────────────────────────────────┴───────────┘
//! ```
//!
//! The snapshot only bounds how much log has to be replayed. The log is the
//! source of truth; an unreadable snapshot is ignored and the log replayed from 0.

mod replay;
mod snapshot;
mod table;

pub use replay::ReplayOutcome;
pub use table::{Index, IndexEntry};
