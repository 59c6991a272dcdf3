use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::message::{Message, MessageKind};

/// Frame header: magic (1) + tag (1) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Frame start marker: `%` (0x25).
pub const MAGIC: u8 = b'%';

/// Default maximum body size for variable-length (`Error`) messages: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Decode one message from a buffer.
///
/// Bytes before the next magic marker are discarded (resynchronization).
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// The type tag and the body length are validated as soon as the header is
/// available, so a bad header fails without waiting for its body. On success
/// the frame bytes are consumed from the buffer.
///
/// Resynchronization only skips bytes that precede a magic marker. A magic
/// marker followed by a corrupt header is an error, not a reason to scan on.
pub fn decode_message(src: &mut BytesMut, max_payload: usize) -> Result<Option<Message>> {
    skip_to_magic(src);

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let tag = src[1];
    let kind = MessageKind::from_tag(tag).ok_or(FrameError::UnknownType(tag))?;
    let body_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;

    match kind.body_len() {
        Some(expected) if expected != body_len => {
            return Err(FrameError::body_length(kind, expected, body_len));
        }
        None if body_len > max_payload => {
            return Err(FrameError::PayloadTooLarge {
                size: body_len,
                max: max_payload,
            });
        }
        _ => {}
    }

    let total = HEADER_SIZE + body_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let body = src.split_to(body_len);
    Message::decode_kind(kind, &body).map(Some)
}

fn skip_to_magic(src: &mut BytesMut) {
    let discarded = match src.iter().position(|b| *b == MAGIC) {
        Some(0) => return,
        Some(pos) => {
            src.advance(pos);
            pos
        }
        None => {
            let len = src.len();
            src.clear();
            len
        }
    };
    if discarded > 0 {
        debug!(discarded, "discarded bytes before frame magic");
    }
}

/// Configuration for message readers and writers.
#[derive(Debug, Clone)]
pub struct MessageConfig {
    /// Maximum `Error` body size in bytes. Default: 64 KiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations. Default: block indefinitely.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations. Default: block indefinitely.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
