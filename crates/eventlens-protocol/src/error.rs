//! Errors raised while reading or writing native-messaging frames.

use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The length prefix is over the limit for this direction.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: u32, max: u32 },

    /// The payload is not the JSON we expect. The frame was fully consumed.
    #[error("invalid frame payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("native messaging pipe: {0}")]
    Io(#[from] std::io::Error),

    /// A buffer ended before the length its prefix announced.
    #[error("truncated frame: need {expected} bytes, have {received}")]
    IncompleteMessage { expected: usize, received: usize },

    /// A zero length prefix.
    #[error("zero-length frame")]
    EmptyMessage,
}
