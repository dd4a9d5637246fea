//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! Strings are `len (4 bytes) + UTF-8 bytes`.
//! - GET / DELETE / CONTAINS / TIMESTAMP: bucket + key
//! - PUT:             bucket + key + value (rest of payload)
//! - KEYS / COMPACT:  empty (all buckets) or bucket
//! - SIZE / FLUSH / PING: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use crate::error::{DriftError, Result};

use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = Vec::new();

    match command {
        Command::Get { bucket, key }
        | Command::Delete { bucket, key }
        | Command::Contains { bucket, key }
        | Command::Timestamp { bucket, key } => {
            put_string(&mut payload, bucket);
            put_string(&mut payload, key);
        }
        Command::Put { bucket, key, value } => {
            put_string(&mut payload, bucket);
            put_string(&mut payload, key);
            payload.put_slice(value);
        }
        Command::Keys { bucket } | Command::Compact { bucket } => {
            if let Some(bucket) = bucket {
                put_string(&mut payload, bucket);
            }
        }
        Command::Size | Command::Flush | Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_byte, payload) = unframe(bytes, "command")?;

    let cmd_type = CommandType::from_byte(cmd_byte).ok_or_else(|| {
        DriftError::Protocol(format!("Unknown command type: 0x{:02x}", cmd_byte))
    })?;

    let mut payload = payload;
    let command = match cmd_type {
        CommandType::Get => {
            let (bucket, key) = get_bucket_key(&mut payload, "GET")?;
            Command::Get { bucket, key }
        }
        CommandType::Put => {
            let (bucket, key) = get_bucket_key(&mut payload, "PUT")?;
            let value = payload.to_vec();
            payload = &[];
            Command::Put { bucket, key, value }
        }
        CommandType::Delete => {
            let (bucket, key) = get_bucket_key(&mut payload, "DELETE")?;
            Command::Delete { bucket, key }
        }
        CommandType::Contains => {
            let (bucket, key) = get_bucket_key(&mut payload, "CONTAINS")?;
            Command::Contains { bucket, key }
        }
        CommandType::Timestamp => {
            let (bucket, key) = get_bucket_key(&mut payload, "TIMESTAMP")?;
            Command::Timestamp { bucket, key }
        }
        CommandType::Keys => Command::Keys {
            bucket: get_optional_bucket(&mut payload, "KEYS")?,
        },
        CommandType::Compact => Command::Compact {
            bucket: get_optional_bucket(&mut payload, "COMPACT")?,
        },
        CommandType::Size => Command::Size,
        CommandType::Flush => Command::Flush,
        CommandType::Ping => Command::Ping,
    };

    if !payload.is_empty() {
        return Err(DriftError::Protocol(format!(
            "{:?} command: unexpected {} trailing bytes",
            cmd_type,
            payload.len()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = unframe(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        _ => {
            return Err(DriftError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Header + payload
fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message
}

/// Split a framed message into (tag, payload), checking lengths
fn unframe<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(DriftError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let tag = header.get_u8();
    let payload_len = header.get_u32();

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(DriftError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(DriftError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

/// Read header, then exactly the announced payload
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(DriftError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn get_string(payload: &mut &[u8], what: &str, field: &str) -> Result<String> {
    if payload.remaining() < 4 {
        return Err(DriftError::Protocol(format!(
            "{} command: missing {} length",
            what, field
        )));
    }
    let len = payload.get_u32() as usize;

    if payload.remaining() < len {
        return Err(DriftError::Protocol(format!(
            "{} command: incomplete {} (expected {}, got {})",
            what,
            field,
            len,
            payload.remaining()
        )));
    }

    let s = String::from_utf8(payload[..len].to_vec()).map_err(|_| {
        DriftError::Protocol(format!("{} command: {} is not UTF-8", what, field))
    })?;
    payload.advance(len);
    Ok(s)
}

fn get_bucket_key(payload: &mut &[u8], what: &str) -> Result<(String, String)> {
    let bucket = get_string(payload, what, "bucket")?;
    let key = get_string(payload, what, "key")?;
    Ok((bucket, key))
}

fn get_optional_bucket(payload: &mut &[u8], what: &str) -> Result<Option<String>> {
    if payload.is_empty() {
        return Ok(None);
    }
    get_string(payload, what, "bucket").map(Some)
}
