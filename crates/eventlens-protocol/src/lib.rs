//! Message types and framing for the eventlens native-messaging host.
//!
//! The calendar page's content script asks for event details with an
//! `events` message; the host answers with `showEvent` messages which the
//! extension posts to the open calendar tabs.
//!
//! # Framing
//!
//! Messages cross stdin/stdout the way browsers speak to native hosts:
//! - 4 bytes: message length (u32, native byte order)
//! - N bytes: UTF-8 JSON payload
//!
//! # Example
//!
//! ```rust
//! use eventlens_protocol::{InboundFrame, InboundMessage, EventRequest, encode_message, decode_message};
//!
//! let frame = InboundFrame::new(InboundMessage::events(vec![EventRequest::new("Work", "evt1")]));
//! let bytes = encode_message(&frame).unwrap();
//! let decoded: InboundFrame = decode_message(&bytes).unwrap();
//! assert_eq!(decoded, frame);
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{FrameReader, FrameWriter, decode_message, encode_message};
pub use types::{
    EventRequest, InboundFrame, InboundMessage, MessageSender, OutboundFrame, OutboundMessage,
    SHOW_EVENT, Tab,
};

/// Maximum size of a message sent to the browser (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Maximum size of a message accepted from the browser (64 MiB).
pub const MAX_INBOUND_MESSAGE_SIZE: u32 = 64 * 1024 * 1024;
