//! Typed protocol messages.
//!
//! | tag | message      | body                                  |
//! |-----|--------------|---------------------------------------|
//! | `C` | `CurrentPos` | x, y as little-endian `f64` (16 bytes) |
//! | `G` | `GotoPos`    | x, y as little-endian `f64` (16 bytes) |
//! | `P` | `PenUpdown`  | `d` (down) or `u` (up)                |
//! | `K` | `Ok`         | empty                                 |
//! | `E` | `Error`      | UTF-8 reason text                     |

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{HEADER_SIZE, MAGIC};
use crate::error::{FrameError, Result};

const COORDS_LEN: usize = 16;
const PEN_DOWN: u8 = b'd';
const PEN_UP: u8 = b'u';

/// The five message types, one per wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    CurrentPos,
    GotoPos,
    PenUpdown,
    Ok,
    Error,
}

impl MessageKind {
    /// All kinds, in tag order of the protocol table.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::CurrentPos,
        MessageKind::GotoPos,
        MessageKind::PenUpdown,
        MessageKind::Ok,
        MessageKind::Error,
    ];

    /// Single-byte wire tag.
    pub fn tag(self) -> u8 {
        match self {
            MessageKind::CurrentPos => b'C',
            MessageKind::GotoPos => b'G',
            MessageKind::PenUpdown => b'P',
            MessageKind::Ok => b'K',
            MessageKind::Error => b'E',
        }
    }

    /// Look up a kind by wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'C' => Some(MessageKind::CurrentPos),
            b'G' => Some(MessageKind::GotoPos),
            b'P' => Some(MessageKind::PenUpdown),
            b'K' => Some(MessageKind::Ok),
            b'E' => Some(MessageKind::Error),
            _ => None,
        }
    }

    /// Exact body size for fixed-size kinds, `None` for `Error`.
    pub fn body_len(self) -> Option<usize> {
        match self {
            MessageKind::CurrentPos | MessageKind::GotoPos => Some(COORDS_LEN),
            MessageKind::PenUpdown => Some(1),
            MessageKind::Ok => Some(0),
            MessageKind::Error => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::CurrentPos => "current_pos",
            MessageKind::GotoPos => "goto_pos",
            MessageKind::PenUpdown => "pen_updown",
            MessageKind::Ok => "ok",
            MessageKind::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A protocol message. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Where the controller observed the marker.
    CurrentPos { x: f64, y: f64 },
    /// Where the plotter should move the marker.
    GotoPos { x: f64, y: f64 },
    /// Lower (`down = true`) or raise the pen.
    PenUpdown { down: bool },
    /// Command accepted.
    Ok,
    /// Command rejected, with a reason.
    Error { reason: Bytes },
}

impl Message {
    /// Build an `Error` message from reason text.
    pub fn error(reason: impl Into<String>) -> Self {
        Message::Error {
            reason: Bytes::from(reason.into()),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::CurrentPos { .. } => MessageKind::CurrentPos,
            Message::GotoPos { .. } => MessageKind::GotoPos,
            Message::PenUpdown { .. } => MessageKind::PenUpdown,
            Message::Ok => MessageKind::Ok,
            Message::Error { .. } => MessageKind::Error,
        }
    }

    /// Reason text of an `Error` message (lossy UTF-8).
    pub fn reason_text(&self) -> Option<String> {
        match self {
            Message::Error { reason } => Some(String::from_utf8_lossy(reason).into_owned()),
            _ => None,
        }
    }

    /// Size of the encoded body in bytes.
    pub fn body_len(&self) -> usize {
        match self {
            Message::Error { reason } => reason.len(),
            other => other.kind().body_len().unwrap_or(0),
        }
    }

    /// Total wire size of this message (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body_len()
    }

    /// Encode this message into the wire format.
    ///
    /// ```text
    /// ┌────────────┬──────────┬──────────────┬──────────────────┐
    /// │ Magic (1B) │ Tag (1B) │ Length       │ Body             │
    /// │ '%'        │ C/G/P/K/E│ (4B LE)      │ (Length bytes)   │
    /// └────────────┴──────────┴──────────────┴──────────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let body_len = self.body_len();
        if body_len > u32::MAX as usize {
            return Err(FrameError::PayloadTooLarge {
                size: body_len,
                max: u32::MAX as usize,
            });
        }

        dst.reserve(HEADER_SIZE + body_len);
        dst.put_u8(MAGIC);
        dst.put_u8(self.kind().tag());
        dst.put_u32_le(body_len as u32);

        match self {
            Message::CurrentPos { x, y } | Message::GotoPos { x, y } => {
                dst.put_f64_le(*x);
                dst.put_f64_le(*y);
            }
            Message::PenUpdown { down } => dst.put_u8(if *down { PEN_DOWN } else { PEN_UP }),
            Message::Ok => {}
            Message::Error { reason } => dst.put_slice(reason),
        }
        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode an already-delimited body for the given type tag.
    pub fn decode(tag: u8, body: &[u8]) -> Result<Self> {
        let kind = MessageKind::from_tag(tag).ok_or(FrameError::UnknownType(tag))?;
        Self::decode_kind(kind, body)
    }

    pub(crate) fn decode_kind(kind: MessageKind, body: &[u8]) -> Result<Self> {
        if let Some(expected) = kind.body_len() {
            if body.len() != expected {
                return Err(FrameError::body_length(kind, expected, body.len()));
            }
        }

        match kind {
            MessageKind::CurrentPos => {
                let (x, y) = read_coords(body);
                Ok(Message::CurrentPos { x, y })
            }
            MessageKind::GotoPos => {
                let (x, y) = read_coords(body);
                Ok(Message::GotoPos { x, y })
            }
            MessageKind::PenUpdown => match body[0] {
                PEN_DOWN => Ok(Message::PenUpdown { down: true }),
                PEN_UP => Ok(Message::PenUpdown { down: false }),
                other => Err(FrameError::MalformedBody {
                    kind,
                    detail: format!("expected 'd' or 'u', got 0x{other:02x}"),
                }),
            },
            MessageKind::Ok => Ok(Message::Ok),
            MessageKind::Error => Ok(Message::Error {
                reason: Bytes::copy_from_slice(body),
            }),
        }
    }
}

// Caller has checked the length.
fn read_coords(body: &[u8]) -> (f64, f64) {
    let mut x = [0u8; 8];
    let mut y = [0u8; 8];
    x.copy_from_slice(&body[0..8]);
    y.copy_from_slice(&body[8..16]);
    (f64::from_le_bytes(x), f64::from_le_bytes(y))
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::CurrentPos { x, y } => write!(f, "current position x: {x}, y: {y}"),
            Message::GotoPos { x, y } => write!(f, "go to x: {x}, y: {y}"),
            Message::PenUpdown { down: true } => f.write_str("pen down"),
            Message::PenUpdown { down: false } => f.write_str("pen up"),
            Message::Ok => f.write_str("ok"),
            Message::Error { reason } => write!(f, "error: {}", String::from_utf8_lossy(reason)),
        }
    }
}
