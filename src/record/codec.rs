//! Record codec
//!
//! Encoding and decoding of single log records.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};

use crate::error::{DriftError, Result};

use super::{HEADER_SIZE, MAX_KEY_LEN, MAX_VALUE_LEN};

// =============================================================================
// Header
// =============================================================================

/// Fixed-size prefix of every record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Epoch milliseconds at write time
    pub timestamp: i64,
    pub key_len: u8,
    pub value_len: u32,
    /// Tombstone flag
    pub deleted: bool,
}

impl RecordHeader {
    /// Total encoded size of the record this header describes
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.key_len) + u64::from(self.value_len)
    }

    /// Size of key + value following the header
    pub fn payload_len(&self) -> u64 {
        u64::from(self.key_len) + u64::from(self.value_len)
    }

    /// Write the header in wire order
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64(self.timestamp);
        buf.put_u8(self.key_len);
        buf.put_u32(self.value_len);
        buf.put_u8(u8::from(self.deleted));
    }

    /// Parse a header from the first `HEADER_SIZE` bytes of `bytes`
    ///
    /// Short input is a truncation; impossible field values are corruption.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DriftError::TruncatedRecord {
                offset: 0,
                needed: HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        let timestamp = buf.get_i64();
        let key_len = buf.get_u8();
        let value_len = buf.get_u32();
        let deleted = match buf.get_u8() {
            0 => false,
            1 => true,
            other => {
                return Err(DriftError::Corruption(format!(
                    "deleted flag must be 0 or 1, got {}",
                    other
                )))
            }
        };

        if usize::from(key_len) > MAX_KEY_LEN {
            return Err(DriftError::Corruption(format!(
                "key length {} exceeds {}",
                key_len, MAX_KEY_LEN
            )));
        }
        if value_len > MAX_VALUE_LEN {
            return Err(DriftError::Corruption(format!(
                "value length {} exceeds {}",
                value_len, MAX_VALUE_LEN
            )));
        }
        if deleted && value_len != 0 {
            return Err(DriftError::Corruption(format!(
                "tombstone carries {} value bytes",
                value_len
            )));
        }

        Ok(Self {
            timestamp,
            key_len,
            value_len,
            deleted,
        })
    }
}

// =============================================================================
// Record
// =============================================================================

/// A fully decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: i64,
    pub key: String,
    pub value: Vec<u8>,
    pub deleted: bool,
}

impl Record {
    /// A live value
    pub fn put(key: impl Into<String>, value: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            timestamp,
            key: key.into(),
            value: value.into(),
            deleted: false,
        }
    }

    /// A tombstone for `key`
    pub fn tombstone(key: impl Into<String>, timestamp: i64) -> Self {
        Self {
            timestamp,
            key: key.into(),
            value: Vec::new(),
            deleted: true,
        }
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_record(&self.key, &self.value, self.deleted, self.timestamp)
    }
}

// =============================================================================
// Encode / Decode
// =============================================================================

/// Check key and value lengths against the record limits
///
/// `max_value_size` is the configured bound; it is clamped to the format limit.
pub fn validate_entry(key: &str, value_len: usize, max_value_size: u32) -> Result<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(DriftError::Validation(format!(
            "Max length of key is {} bytes, was {}",
            MAX_KEY_LEN,
            key.len()
        )));
    }

    let limit = max_value_size.min(MAX_VALUE_LEN) as usize;
    if value_len > limit {
        return Err(DriftError::Validation(format!(
            "Max length of value is {} bytes, was {}",
            limit, value_len
        )));
    }

    Ok(())
}

/// Encode one record
///
/// Format: timestamp (8) + key_len (1) + value_len (4) + deleted (1) + key + value
pub fn encode_record(key: &str, value: &[u8], deleted: bool, timestamp: i64) -> Result<Vec<u8>> {
    validate_entry(key, value.len(), MAX_VALUE_LEN)?;

    if deleted && !value.is_empty() {
        return Err(DriftError::Validation(
            "Tombstone records cannot carry a value".to_string(),
        ));
    }

    let header = RecordHeader {
        timestamp,
        key_len: key.len() as u8,
        value_len: value.len() as u32,
        deleted,
    };

    let mut buf = Vec::with_capacity(HEADER_SIZE + key.len() + value.len());
    header.encode_into(&mut buf);
    buf.put_slice(key.as_bytes());
    buf.put_slice(value);

    Ok(buf)
}

/// Decode one record from the front of `buf`, advancing it past the record
///
/// Offsets in a `TruncatedRecord` error are relative to where decoding began.
pub fn decode_record<B: Buf>(buf: &mut B) -> Result<Record> {
    let available = buf.remaining() as u64;

    let mut header_bytes = [0u8; HEADER_SIZE];
    if buf.remaining() < HEADER_SIZE {
        return Err(DriftError::TruncatedRecord {
            offset: 0,
            needed: HEADER_SIZE as u64,
            available,
        });
    }
    buf.copy_to_slice(&mut header_bytes);
    let header = RecordHeader::decode(&header_bytes)?;

    if (buf.remaining() as u64) < header.payload_len() {
        return Err(DriftError::TruncatedRecord {
            offset: 0,
            needed: header.record_len(),
            available,
        });
    }

    let mut key = vec![0u8; usize::from(header.key_len)];
    buf.copy_to_slice(&mut key);
    let key = String::from_utf8(key)
        .map_err(|e| DriftError::Corruption(format!("key is not UTF-8: {}", e)))?;

    let mut value = vec![0u8; header.value_len as usize];
    buf.copy_to_slice(&mut value);

    Ok(Record {
        timestamp: header.timestamp,
        key,
        value,
        deleted: header.deleted,
    })
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
