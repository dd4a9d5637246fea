//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET        - bucket + key
//! - 0x02: PUT        - bucket + key + value
//! - 0x03: DEL        - bucket + key
//! - 0x04: PING       - empty
//! - 0x05: CONTAINS   - bucket + key
//! - 0x06: TIMESTAMP  - bucket + key
//! - 0x07: KEYS       - optional bucket
//! - 0x08: SIZE       - empty
//! - 0x09: COMPACT    - optional bucket
//! - 0x0A: FLUSH      - empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Reply, Response, Status};
