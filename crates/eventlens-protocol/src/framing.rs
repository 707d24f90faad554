//! Length-prefixed message framing for native messaging.
//!
//! Each message is a 4-byte length in native byte order followed by the
//! JSON payload:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 NE)  |  JSON payload    |
//! +----------------+------------------+
//! ```

use std::io::{Read, Write};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{ProtocolError, ProtocolResult};
use crate::{MAX_INBOUND_MESSAGE_SIZE, MAX_MESSAGE_SIZE};

/// Encodes a message to bytes with length prefix.
///
/// Fails when the payload exceeds what a browser accepts from a host.
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = u32::try_from(json.len()).unwrap_or(u32::MAX);

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buffer = Vec::with_capacity(4 + json.len());
    buffer.extend_from_slice(&len.to_ne_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

/// Decodes a message from bytes with length prefix.
///
/// The input should be a complete framed message (length prefix + payload).
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    let Some((len_bytes, rest)) = data.split_first_chunk::<4>() else {
        return Err(ProtocolError::IncompleteMessage {
            expected: 4,
            received: data.len(),
        });
    };

    let len = u32::from_ne_bytes(*len_bytes);
    if len > MAX_INBOUND_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_INBOUND_MESSAGE_SIZE,
        });
    }

    let len = len as usize;
    if rest.len() < len {
        return Err(ProtocolError::IncompleteMessage {
            expected: 4 + len,
            received: data.len(),
        });
    }

    Ok(serde_json::from_slice(&rest[..len])?)
}

/// Reads framed messages from a byte stream.
pub struct FrameReader<R> {
    reader: R,
}

impl<R: Read> FrameReader<R> {
    /// Creates a new FrameReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads a single framed message.
    ///
    /// Returns `Ok(None)` when the browser closed the pipe (EOF before any
    /// bytes). Returns an error if the message is incomplete or malformed.
    pub fn read_message<T: DeserializeOwned>(&mut self) -> ProtocolResult<Option<T>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_ne_bytes(len_buf);

        if len > MAX_INBOUND_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: len,
                max: MAX_INBOUND_MESSAGE_SIZE,
            });
        }

        if len == 0 {
            return Err(ProtocolError::EmptyMessage);
        }

        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload)?;

        Ok(Some(serde_json::from_slice(&payload)?))
    }
}

/// Writes framed messages to a byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    /// Creates a new FrameWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a single framed message and flushes it.
    ///
    /// The browser only sees a message once it is flushed, so every write
    /// flushes.
    pub fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let data = encode_message(message)?;
        self.writer.write_all(&data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwraps this FrameWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventRequest, InboundFrame, InboundMessage, OutboundFrame, OutboundMessage};
    use eventlens_core::Event;
    use std::io::Cursor;

    fn events_frame() -> InboundFrame {
        InboundFrame::new(InboundMessage::events(vec![
            EventRequest::new("Work", "evt1"),
            EventRequest::new("Personal", "evt2"),
        ]))
    }

    #[test]
    fn length_prefix_is_native_endian() {
        let bytes = encode_message(&events_frame()).unwrap();
        let len = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(len as usize, bytes.len() - 4);

        let decoded: InboundFrame = decode_message(&bytes).unwrap();
        assert_eq!(decoded, events_frame());
    }

    #[test]
    fn decode_incomplete_length() {
        let result: ProtocolResult<InboundFrame> = decode_message(&[0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { expected: 4, .. })
        ));
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut data = 100u32.to_ne_bytes().to_vec();
        data.extend_from_slice(&[0u8; 10]);

        let result: ProtocolResult<InboundFrame> = decode_message(&data);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { expected: 104, .. })
        ));
    }

    #[test]
    fn inbound_message_too_large() {
        let data = (MAX_INBOUND_MESSAGE_SIZE + 1).to_ne_bytes();
        let result: ProtocolResult<InboundFrame> = decode_message(&data);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn outbound_message_too_large() {
        let event = Event::new("big").with_description("x".repeat(MAX_MESSAGE_SIZE as usize));
        let frame = OutboundFrame::new("https://example.com/*", OutboundMessage::show_event(event));
        assert!(matches!(
            encode_message(&frame),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn frame_reader_empty_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        let result: Option<InboundFrame> = reader.read_message().unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn frame_reader_multiple_messages() {
        let first = events_frame();
        let second = InboundFrame::new(InboundMessage::events(Vec::new()));

        let mut bytes = encode_message(&first).unwrap();
        bytes.extend(encode_message(&second).unwrap());

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let decoded1: InboundFrame = reader.read_message().unwrap().unwrap();
        let decoded2: InboundFrame = reader.read_message().unwrap().unwrap();
        let eof: Option<InboundFrame> = reader.read_message().unwrap();

        assert_eq!(decoded1, first);
        assert_eq!(decoded2, second);
        assert!(eof.is_none());
    }

    #[test]
    fn frame_reader_empty_message_error() {
        let buffer = 0u32.to_ne_bytes().to_vec();
        let mut reader = FrameReader::new(Cursor::new(buffer));
        let result: ProtocolResult<Option<InboundFrame>> = reader.read_message();
        assert!(matches!(result, Err(ProtocolError::EmptyMessage)));
    }

    #[test]
    fn frame_writer_output_is_readable() {
        let frame = OutboundFrame::new(
            "https://calendar.google.com/calendar*",
            OutboundMessage::show_event(Event::new("evt1")),
        );
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_message(&frame).unwrap();

        let decoded: OutboundFrame = decode_message(writer.get_ref()).unwrap();
        assert_eq!(decoded, frame);
    }
}
