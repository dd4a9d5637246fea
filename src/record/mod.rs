//! Record Module
//!
//! The unit stored in a bucket's data log.
//!
//! ## Responsibilities
//! - Encode one record (fixed header + key + value)
//! - Decode a record, reporting truncated tails instead of garbage
//! - Validate key and value lengths before any I/O
//!
//! ## Record Format (big-endian)
//! ```text
//! ┌───────────────┬────────────┬──────────────┬────────────┬───────┬─────────┐
//! │ Timestamp (8) │ KeyLen (1) │ ValueLen (4) │ Deleted (1)│  Key  │  Value  │
//! └───────────────┴────────────┴──────────────┴────────────┴───────┴─────────┘
//! ```
//! - KeyLen is 0..=127, key bytes are UTF-8
//! - Deleted is 0 or 1; a tombstone always has ValueLen = 0

mod codec;

pub use codec::{
    decode_record, encode_record, now_millis, validate_entry, Record, RecordHeader,
};

/// Header size: Timestamp (8) + KeyLen (1) + ValueLen (4) + Deleted (1) = 14 bytes
pub const HEADER_SIZE: usize = 14;

/// Longest key accepted (fits the positive range of one signed byte)
pub const MAX_KEY_LEN: usize = i8::MAX as usize;

/// Hard upper bound for a value, independent of configuration
pub const MAX_VALUE_LEN: u32 = i32::MAX as u32;
