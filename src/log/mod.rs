//! Log Module
//!
//! The append-only data file behind every bucket.
//!
//! ## Responsibilities
//! - Append encoded records at end-of-file and report their offsets
//! - Force appended bytes to stable storage on demand
//! - Scan the file sequentially, stopping cleanly at a torn tail
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1 (offset 0)                     │
//! │ ┌───────────┬──────┬───────┬──────────┐ │
//! │ │Header (14)│ Key  │ Value │          │ │
//! │ └───────────┴──────┴───────┘          │ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 (offset = len(Record 1))       │
//! ├─────────────────────────────────────────┤
//! │ ... possibly a partial record at EOF    │
//! └─────────────────────────────────────────┘
//! ```

mod scanner;
mod writer;

pub use scanner::{LogScanner, ScannedRecord};
pub use writer::AppendLog;
