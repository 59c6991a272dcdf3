use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use wireplot_transport::PlotStream;

use crate::codec::{decode_message, MessageConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads and leading garbage internally; callers always get
/// complete messages.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    config: MessageConfig,
}

impl<T: Read> MessageReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, MessageConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: MessageConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached before
    /// a full frame.
    pub fn receive(&mut self) -> Result<Message> {
        loop {
            if let Some(msg) = decode_message(&mut self.buf, self.config.max_payload_size)? {
                tracing::trace!(kind = %msg.kind(), "received message");
                return Ok(msg);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &MessageConfig {
        &self.config
    }
}

impl MessageReader<PlotStream> {
    /// Create a reader for `PlotStream` and apply the read timeout from config.
    pub fn with_config_stream(inner: PlotStream, config: MessageConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: wireplot_transport::TransportError) -> FrameError {
    match err {
        wireplot_transport::TransportError::Io(io)
        | wireplot_transport::TransportError::Accept(io) => FrameError::Io(io),
        wireplot_transport::TransportError::Bind { source, .. }
        | wireplot_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::MAGIC;

    fn wire(messages: &[Message]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for msg in messages {
            msg.encode(&mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_message() {
        let mut reader = MessageReader::new(Cursor::new(wire(&[Message::GotoPos {
            x: 10.0,
            y: 20.0,
        }])));
        let msg = reader.receive().unwrap();
        assert_eq!(msg, Message::GotoPos { x: 10.0, y: 20.0 });
    }

    #[test]
    fn read_multiple_messages() {
        let mut reader = MessageReader::new(Cursor::new(wire(&[
            Message::PenUpdown { down: true },
            Message::GotoPos { x: 1.0, y: 2.0 },
            Message::Ok,
        ])));

        assert_eq!(reader.receive().unwrap(), Message::PenUpdown { down: true });
        assert_eq!(reader.receive().unwrap(), Message::GotoPos { x: 1.0, y: 2.0 });
        assert_eq!(reader.receive().unwrap(), Message::Ok);
        assert!(matches!(
            reader.receive().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn garbage_before_frame_is_skipped() {
        let mut bytes = vec![0x00, 0x00];
        bytes.extend_from_slice(&[MAGIC, b'K', 0, 0, 0, 0]);

        let mut reader = MessageReader::new(Cursor::new(bytes));
        assert_eq!(reader.receive().unwrap(), Message::Ok);
    }

    #[test]
    fn partial_read_handling() {
        let mut bytes = b"junk".to_vec();
        bytes.extend(wire(&[Message::error("slow")]));

        let mut reader = MessageReader::new(ByteByByteReader { bytes, pos: 0 });
        let msg = reader.receive().unwrap();
        assert_eq!(msg.reason_text().as_deref(), Some("slow"));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.receive().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u8(MAGIC);
        partial.put_u8(b'G');
        partial.put_u32_le(16);
        partial.put_f64_le(1.0);

        let mut reader = MessageReader::new(Cursor::new(partial.to_vec()));
        let err = reader.receive().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_during_resync() {
        let mut reader = MessageReader::new(Cursor::new(b"no marker here".to_vec()));
        let err = reader.receive().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn unknown_type_in_stream() {
        let bytes = vec![MAGIC, b'Q', 0x00, 0x00, 0x00, 0x00];
        let mut reader = MessageReader::new(Cursor::new(bytes));
        let err = reader.receive().unwrap_err();
        assert!(matches!(err, FrameError::UnknownType(b'Q')));
    }

    #[test]
    fn oversized_error_in_stream() {
        let mut bytes = BytesMut::new();
        bytes.put_u8(MAGIC);
        bytes.put_u8(b'E');
        bytes.put_u32_le(1024);

        let cfg = MessageConfig {
            max_payload_size: 16,
            ..MessageConfig::default()
        };
        let mut reader = MessageReader::with_config(Cursor::new(bytes.to_vec()), cfg);
        let err = reader.receive().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire(&[Message::PenUpdown { down: false }]),
            pos: 0,
        };
        let mut framed = MessageReader::new(reader);
        assert_eq!(framed.receive().unwrap(), Message::PenUpdown { down: false });
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut framed = MessageReader::new(WouldBlockReader);
        let err = framed.receive().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn roundtrip_over_tcp() {
        let listener = wireplot_transport::TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let server = std::thread::spawn(move || {
            let stream = listener.accept().unwrap();
            let mut reader = MessageReader::with_config_stream(stream, MessageConfig::default())
                .unwrap();
            reader.receive().unwrap()
        });

        let stream = wireplot_transport::TcpTransport::connect(addr).unwrap();
        let mut writer = crate::writer::MessageWriter::new(stream);
        writer.send(&Message::GotoPos { x: 3.0, y: 4.0 }).unwrap();

        assert_eq!(server.join().unwrap(), Message::GotoPos { x: 3.0, y: 4.0 });
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = MessageReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_payload_size, crate::DEFAULT_MAX_PAYLOAD);
        let _inner = reader.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct WouldBlockReader;

    impl Read for WouldBlockReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
