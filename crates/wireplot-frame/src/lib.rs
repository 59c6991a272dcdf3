//! Length-prefixed command protocol between the plotter and its controller.
//!
//! Every message is framed with:
//! - A 1-byte magic marker (`%`) for stream synchronization
//! - A 1-byte message type tag (`C`, `G`, `P`, `K`, `E`)
//! - A 4-byte little-endian body length
//!
//! Readers discard stray bytes until the next magic marker, so a controller
//! that starts mid-stream or after line noise still gets whole messages.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod session;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod writer;

pub use codec::{decode_message, MessageConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC};
pub use error::{FrameError, Result};
pub use message::{Message, MessageKind};
pub use reader::MessageReader;
pub use session::Session;
#[cfg(feature = "async")]
pub use tokio_codec::MessageCodec;
pub use writer::MessageWriter;
