//! `tokio_util::codec` adapter for hosts that run the protocol on an async runtime.
//!
//! The motion loop itself stays blocking; this only moves message framing
//! onto the runtime.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::message::Message;

/// Message codec for `FramedRead`/`FramedWrite`, with the same resync rules
/// as the blocking reader.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_payload_size: usize,
}

impl MessageCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        decode_message(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        if item.body_len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.body_len(),
                max: self.max_payload_size,
            });
        }
        item.encode(dst)
    }
}
