//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
    Contains = 0x05,
    Timestamp = 0x06,
    Keys = 0x07,
    Size = 0x08,
    Compact = 0x09,
    Flush = 0x0A,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => CommandType::Get,
            0x02 => CommandType::Put,
            0x03 => CommandType::Delete,
            0x04 => CommandType::Ping,
            0x05 => CommandType::Contains,
            0x06 => CommandType::Timestamp,
            0x07 => CommandType::Keys,
            0x08 => CommandType::Size,
            0x09 => CommandType::Compact,
            0x0A => CommandType::Flush,
            _ => return None,
        })
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { bucket: String, key: String },

    /// Put a key-value pair
    Put {
        bucket: String,
        key: String,
        value: Vec<u8>,
    },

    /// Delete a key
    Delete { bucket: String, key: String },

    /// Does the key hold a live value
    Contains { bucket: String, key: String },

    /// Timestamp of the live value
    Timestamp { bucket: String, key: String },

    /// Sorted "bucket/key" list, for one bucket or all
    Keys { bucket: Option<String> },

    /// Live keys across all buckets
    Size,

    /// Compact one bucket or all
    Compact { bucket: Option<String> },

    /// Flush staged writes in every bucket
    Flush,

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Contains { .. } => CommandType::Contains,
            Command::Timestamp { .. } => CommandType::Timestamp,
            Command::Keys { .. } => CommandType::Keys,
            Command::Size => CommandType::Size,
            Command::Compact { .. } => CommandType::Compact,
            Command::Flush => CommandType::Flush,
            Command::Ping => CommandType::Ping,
        }
    }
}
