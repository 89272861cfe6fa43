//! Message types and framing for the browser extension boundary.
//!
//! The extension sends two kinds of request, distinguished by `action`:
//!
//! ```json
//! {"action": "parseEvent", "input": "lunch tomorrow at noon"}
//! {"action": "createEvent", "eventDetails": {"summary": "...", "start": {...}, "end": {...}}}
//! ```
//!
//! and always receives a [`Response`]: `{"success": true, "data": {...}}` or
//! `{"success": false, "error": "..."}`.
//!
//! On the wire each message is a native-messaging frame:
//! - 4 bytes: payload length (u32, native byte order)
//! - N bytes: UTF-8 JSON
//!
//! # Example
//!
//! ```rust
//! use quickcal_protocol::{Request, decode_message, encode_message};
//!
//! let request = Request::parse_event("call at 2am");
//! let bytes = encode_message(&request).unwrap();
//! let decoded: Request = decode_message(&bytes).unwrap();
//! assert_eq!(decoded, request);
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{
    FrameReader, FrameWriter, HEADER_LEN, decode_message, decode_payload, encode_message,
    payload_len,
};
pub use types::{Request, Response};

/// Largest message the host may send to the browser (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Largest message accepted from the browser (64 MiB).
pub const MAX_INBOUND_SIZE: u32 = 64 * 1024 * 1024;
