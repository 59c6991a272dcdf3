use std::net::SocketAddr;

use wireplot_transport::PlotStream;

use crate::codec::MessageConfig;
use crate::error::Result;
use crate::message::Message;
use crate::reader::{transport_to_frame_error, MessageReader};
use crate::writer::MessageWriter;

/// One controller/plotter connection.
///
/// Request/response only: send one message, then receive its reply before
/// sending the next. `&mut self` on every operation keeps a single request in
/// flight and whole frames on the wire.
pub struct Session {
    reader: MessageReader<PlotStream>,
    writer: MessageWriter<PlotStream>,
    peer_addr: Option<SocketAddr>,
}

impl Session {
    /// Wrap a connected stream with default configuration (no timeouts).
    pub fn new(stream: PlotStream) -> Result<Self> {
        Self::with_config(stream, MessageConfig::default())
    }

    /// Wrap a connected stream, applying timeouts and payload limits.
    pub fn with_config(stream: PlotStream, config: MessageConfig) -> Result<Self> {
        let peer_addr = stream.peer_addr().ok();
        let reader_stream = stream.try_clone().map_err(transport_to_frame_error)?;
        let reader = MessageReader::with_config_stream(reader_stream, config.clone())?;
        let writer = MessageWriter::with_config_stream(stream, config)?;
        Ok(Self {
            reader,
            writer,
            peer_addr,
        })
    }

    /// Send one message.
    pub fn send(&mut self, msg: &Message) -> Result<()> {
        self.writer.send(msg)
    }

    /// Receive the next message (blocking).
    pub fn receive(&mut self) -> Result<Message> {
        self.reader.receive()
    }

    /// Send a message and wait for the reply.
    pub fn request(&mut self, msg: &Message) -> Result<Message> {
        self.send(msg)?;
        self.receive()
    }

    /// Remote address, if the transport reported one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Shut down the connection; the peer's next read sees end of stream.
    pub fn shutdown(&self) -> Result<()> {
        self.writer
            .get_ref()
            .shutdown()
            .map_err(transport_to_frame_error)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}
