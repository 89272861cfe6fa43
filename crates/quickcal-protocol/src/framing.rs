//! Native-messaging framing.
//!
//! ```text
//! +--------------------+------------------+
//! | length (4, native) |  JSON payload    |
//! +--------------------+------------------+
//! ```
//!
//! Browsers write and expect the length in the host's native byte order.
//! Outbound frames are limited to [`MAX_MESSAGE_SIZE`]; inbound frames to
//! [`MAX_INBOUND_SIZE`].

use std::io::{ErrorKind, Read, Write};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{ProtocolError, ProtocolResult};
use crate::{MAX_INBOUND_SIZE, MAX_MESSAGE_SIZE};

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Encodes a message as a complete frame.
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = u32::try_from(json.len()).unwrap_or(u32::MAX);

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buffer = Vec::with_capacity(HEADER_LEN + json.len());
    buffer.extend_from_slice(&len.to_ne_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

/// Validates a length prefix and returns the payload length.
pub fn payload_len(header: [u8; HEADER_LEN]) -> ProtocolResult<usize> {
    let len = u32::from_ne_bytes(header);
    if len > MAX_INBOUND_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_INBOUND_SIZE,
        });
    }
    if len == 0 {
        return Err(ProtocolError::EmptyMessage);
    }
    Ok(len as usize)
}

/// Decodes a frame payload (without its prefix).
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decodes a complete frame (prefix and payload).
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    let Some((header, rest)) = data.split_first_chunk::<HEADER_LEN>() else {
        return Err(ProtocolError::IncompleteMessage {
            expected: HEADER_LEN,
            received: data.len(),
        });
    };

    let len = payload_len(*header)?;
    let Some(payload) = rest.get(..len) else {
        return Err(ProtocolError::IncompleteMessage {
            expected: HEADER_LEN + len,
            received: data.len(),
        });
    };

    decode_payload(payload)
}

/// Reads frames from a blocking byte stream.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads one frame.
    ///
    /// Returns `Ok(None)` on a clean end of stream (no bytes of a new
    /// frame read). A stream that ends inside a frame is an error.
    pub fn read_message<T: DeserializeOwned>(&mut self) -> ProtocolResult<Option<T>> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(ProtocolError::IncompleteMessage {
                        expected: HEADER_LEN,
                        received: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let len = payload_len(header)?;
        let mut payload = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.reader.read(&mut payload[filled..]) {
                Ok(0) => {
                    return Err(ProtocolError::IncompleteMessage {
                        expected: HEADER_LEN + len,
                        received: HEADER_LEN + filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        decode_payload(&payload).map(Some)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes frames to a blocking byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one frame and flushes, so the browser sees it immediately.
    pub fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let data = encode_message(message)?;
        self.writer.write_all(&data)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, Response};
    use std::io::Cursor;

    #[test]
    fn prefix_is_native_endian_payload_length() {
        let bytes = encode_message(&Response::ok()).unwrap();
        let len = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(len as usize, bytes.len() - HEADER_LEN);
        assert_eq!(&bytes[HEADER_LEN..], br#"{"success":true}"#);
    }

    #[test]
    fn decode_incomplete_header() {
        let result: ProtocolResult<Request> = decode_message(&[1, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { expected: 4, received: 2 })
        ));
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut data = 100u32.to_ne_bytes().to_vec();
        data.extend_from_slice(&[b' '; 10]);

        let result: ProtocolResult<Request> = decode_message(&data);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { expected: 104, received: 14 })
        ));
    }

    #[test]
    fn inbound_limit_enforced() {
        let data = (MAX_INBOUND_SIZE + 1).to_ne_bytes();
        let result: ProtocolResult<Request> = decode_message(&data);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn outbound_limit_enforced() {
        let big = Response::failure("x".repeat(MAX_MESSAGE_SIZE as usize));
        assert!(matches!(
            encode_message(&big),
            Err(ProtocolError::MessageTooLarge { max: MAX_MESSAGE_SIZE, .. })
        ));
    }

    #[test]
    fn reader_handles_sequence_then_eof() {
        let first = Request::parse_event("lunch tomorrow at noon");
        let second = Request::parse_event("call at 2am");

        let mut bytes = encode_message(&first).unwrap();
        bytes.extend(encode_message(&second).unwrap());

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_message::<Request>().unwrap(), Some(first));
        assert_eq!(reader.read_message::<Request>().unwrap(), Some(second));
        assert_eq!(reader.read_message::<Request>().unwrap(), None);
    }

    #[test]
    fn reader_rejects_truncated_frame() {
        let mut bytes = encode_message(&Request::parse_event("gym")).unwrap();
        let full = bytes.len();
        bytes.truncate(full - 3);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let result = reader.read_message::<Request>();
        match result {
            Err(ProtocolError::IncompleteMessage { expected, received }) => {
                assert_eq!(expected, full);
                assert_eq!(received, full - 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn reader_rejects_partial_header() {
        let mut reader = FrameReader::new(Cursor::new(vec![7u8, 0]));
        let result = reader.read_message::<Request>();
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { expected: 4, received: 2 })
        ));
    }

    #[test]
    fn reader_rejects_empty_frame() {
        let mut reader = FrameReader::new(Cursor::new(0u32.to_ne_bytes().to_vec()));
        let result = reader.read_message::<Request>();
        assert!(matches!(result, Err(ProtocolError::EmptyMessage)));
    }

    #[test]
    fn writer_output_is_readable() {
        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buffer);
            writer.write_message(&Response::ok()).unwrap();
            writer.write_message(&Response::failure("nope")).unwrap();
        }

        let mut reader = FrameReader::new(Cursor::new(buffer));
        assert_eq!(reader.read_message::<Response>().unwrap(), Some(Response::ok()));
        assert_eq!(
            reader.read_message::<Response>().unwrap(),
            Some(Response::failure("nope"))
        );
    }
}
