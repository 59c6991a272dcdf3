use crate::message::MessageKind;

/// Errors that can occur while encoding, decoding or exchanging messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The type tag following the magic byte is not a known message type.
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),

    /// The body does not match what the message type requires.
    #[error("malformed {kind} body: {detail}")]
    MalformedBody { kind: MessageKind, detail: String },

    /// The body exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn body_length(kind: MessageKind, expected: usize, actual: usize) -> Self {
        FrameError::MalformedBody {
            kind,
            detail: format!("expected {expected} bytes, got {actual}"),
        }
    }

    /// True for errors caused by the bytes on the wire rather than the stream.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownType(_)
                | FrameError::MalformedBody { .. }
                | FrameError::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
