//! # DriftKV
//!
//! A log-structured key-value store with:
//! - Append-only data logs, one per bucket, with CRC-checked index snapshots
//! - Crash recovery by replaying the log tail past the snapshot watermark
//! - Single-writer/multi-reader concurrency per bucket
//! - Memory-mapped reads across fixed-size segments
//! - Online compaction of dead records
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Store                                  │
//! │                (bucket name → Bucket)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────┐
//!          │            │            │
//!          ▼            ▼            ▼
//!   ┌───────────┐ ┌───────────┐ ┌───────────────┐
//!   │ AppendLog │ │   Index   │ │ MappedReader  │
//!   │ (<n>.dat) │ │(<n>.index)│ │  (segments)   │
//!   └───────────┘ └───────────┘ └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod bucket;
pub mod index;
pub mod log;
pub mod network;
pub mod protocol;
pub mod record;
pub mod segment;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use bucket::{Bucket, BucketOptions, BucketStats, CompactionStats};
pub use config::{Config, WritePolicy};
pub use error::{DriftError, Result};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DriftKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
