//! Error types for DriftKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DriftError
pub type Result<T> = std::result::Result<T, DriftError>;

/// Unified error type for DriftKV operations
#[derive(Debug, Error)]
pub enum DriftError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    /// Oversized key or value, or an unusable bucket name. Raised before any I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store is read-only: {0}")]
    ReadOnly(String),

    /// Another process or handle already writes this data file.
    #[error("Data file is locked by another writer: {0}")]
    Locked(String),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    /// A record header was found but the bytes behind it stop short.
    #[error("Truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("Corrupt record: {0}")]
    Corruption(String),

    #[error("Read of {len} bytes at offset {offset} runs past mapped extent {mapped}")]
    OutOfRange { offset: u64, len: u64, mapped: u64 },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriftError {
    /// True for the errors that mark the end of the readable log during a scan.
    pub fn is_torn_record(&self) -> bool {
        matches!(
            self,
            DriftError::TruncatedRecord { .. } | DriftError::Corruption(_)
        )
    }
}
