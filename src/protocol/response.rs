//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

/// Result of executing a command against a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Operation succeeded with nothing to return
    Done,
    /// Lookup hit
    Value(Vec<u8>),
    /// Lookup miss
    Missing,
    Flag(bool),
    Number(i64),
    Keys(Vec<String>),
    Pong,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value, flag, number, key list, or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }
}

/// Replies map onto responses as:
/// - flags → one byte (0/1)
/// - numbers → 8 bytes big-endian
/// - keys → newline-separated UTF-8
impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Done => Response::ok(None),
            Reply::Value(value) => Response::ok(Some(value)),
            Reply::Missing => Response::not_found(),
            Reply::Flag(flag) => Response::ok(Some(vec![u8::from(flag)])),
            Reply::Number(n) => Response::ok(Some(n.to_be_bytes().to_vec())),
            Reply::Keys(keys) => Response::ok(Some(keys.join("\n").into_bytes())),
            Reply::Pong => Response::ok(Some(b"PONG".to_vec())),
        }
    }
}
