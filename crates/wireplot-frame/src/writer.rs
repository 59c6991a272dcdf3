use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use wireplot_transport::PlotStream;

use crate::codec::MessageConfig;
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes complete messages to any `Write` stream.
///
/// Each message is encoded into an owned buffer and written out whole before
/// `send` returns, so frames from one writer never interleave.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    config: MessageConfig,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, MessageConfig::default())
    }

    /// Create a new writer with explicit configuration.
    pub fn with_config(inner: T, config: MessageConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send one message (blocking).
    pub fn send(&mut self, msg: &Message) -> Result<()> {
        if msg.body_len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: msg.body_len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        msg.encode(&mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        tracing::trace!(kind = %msg.kind(), size = self.buf.len(), "sent message");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &MessageConfig {
        &self.config
    }
}

impl MessageWriter<PlotStream> {
    /// Create a writer for `PlotStream` and apply the write timeout from config.
    pub fn with_config_stream(inner: PlotStream, config: MessageConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_message, HEADER_SIZE};

    fn written(writer: MessageWriter<Cursor<Vec<u8>>>) -> BytesMut {
        BytesMut::from(writer.into_inner().into_inner().as_slice())
    }

    #[test]
    fn write_single_message() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Message::GotoPos { x: 5.0, y: 6.0 }).unwrap();

        let mut wire = written(writer);
        assert_eq!(wire.len(), HEADER_SIZE + 16);
        let msg = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(msg, Message::GotoPos { x: 5.0, y: 6.0 });
    }

    #[test]
    fn write_multiple_messages() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Message::Ok).unwrap();
        writer.send(&Message::error("out of bounds")).unwrap();
        writer.send(&Message::PenUpdown { down: true }).unwrap();

        let mut wire = written(writer);
        let m1 = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        let m2 = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        let m3 = decode_message(&mut wire, usize::MAX).unwrap().unwrap();

        assert_eq!(m1, Message::Ok);
        assert_eq!(m2.reason_text().as_deref(), Some("out of bounds"));
        assert_eq!(m3, Message::PenUpdown { down: true });
    }

    #[test]
    fn ok_is_header_only() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Message::Ok).unwrap();
        assert_eq!(written(writer).as_ref(), &[b'%', b'K', 0, 0, 0, 0]);
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = MessageConfig {
            max_payload_size: 4,
            ..MessageConfig::default()
        };
        let mut writer = MessageWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send(&Message::error("oversized")).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        // Fixed-size messages are unaffected by a small cap.
        writer.send(&Message::PenUpdown { down: false }).unwrap();
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = MessageWriter::new(sink);

        writer.send(&Message::Ok).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_and_would_block_writes() {
        let mut writer = MessageWriter::new(FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
        });
        writer.send(&Message::GotoPos { x: 1.0, y: 1.0 }).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), HEADER_SIZE + 16);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = MessageWriter::new(ZeroWriter);
        let err = writer.send(&Message::Ok).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn short_writes_complete_the_frame() {
        let mut writer = MessageWriter::new(TwoBytesAtATime { data: Vec::new() });
        writer.send(&Message::error("chunked")).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().data.as_slice());
        let msg = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(msg.reason_text().as_deref(), Some("chunked"));
    }

    #[test]
    fn written_bytes_decode_through_reader() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Message::CurrentPos { x: 7.0, y: 8.0 }).unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = crate::reader::MessageReader::new(Cursor::new(wire));
        assert_eq!(
            reader.receive().unwrap(),
            Message::CurrentPos { x: 7.0, y: 8.0 }
        );
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.failures.pop() {
                return Err(std::io::Error::from(kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct TwoBytesAtATime {
        data: Vec<u8>,
    }

    impl Write for TwoBytesAtATime {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(2);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
