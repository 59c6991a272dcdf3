use std::fmt::Display;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};
use wireplot_frame::{Message, MessageConfig, Session};
use wireplot_motion::Point;
use wireplot_transport::TcpTransport;

use crate::error::{PeerError, Result};

/// Controller-side client: sends one command and waits for its reply.
#[derive(Debug)]
pub struct Controller {
    session: Session,
}

impl Controller {
    /// Connect with default configuration (no timeouts).
    pub fn connect(addr: impl ToSocketAddrs + Display) -> Result<Self> {
        let stream = TcpTransport::connect(addr)?;
        Ok(Self::from_session(Session::new(stream)?))
    }

    /// Connect with a bounded connect time and explicit message config.
    pub fn connect_with_config(
        addr: impl ToSocketAddrs + Display,
        connect_timeout: Duration,
        config: MessageConfig,
    ) -> Result<Self> {
        let stream = TcpTransport::connect_timeout(addr, connect_timeout)?;
        Ok(Self::from_session(Session::with_config(stream, config)?))
    }

    pub fn from_session(session: Session) -> Self {
        Self { session }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.session.peer_addr()
    }

    /// Send any message and return the raw reply.
    pub fn request(&mut self, msg: &Message) -> Result<Message> {
        let reply = self.session.request(msg)?;
        debug!(sent = %msg.kind(), reply = %reply.kind(), "request complete");
        Ok(reply)
    }

    /// Ask the plotter to move to `(x, y)`; returns once the move is done.
    pub fn goto(&mut self, x: f64, y: f64) -> Result<()> {
        self.command(&Message::GotoPos { x, y })
    }

    pub fn pen(&mut self, down: bool) -> Result<()> {
        self.command(&Message::PenUpdown { down })
    }

    /// Tell the plotter where the marker actually is.
    pub fn report_position(&mut self, x: f64, y: f64) -> Result<()> {
        self.command(&Message::CurrentPos { x, y })
    }

    /// Send waypoints in order, stopping at the first rejection.
    pub fn send_path(&mut self, waypoints: &[Point]) -> Result<usize> {
        for (index, point) in waypoints.iter().enumerate() {
            if let Err(err) = self.goto(point.x, point.y) {
                return Err(PeerError::PathRejected {
                    index,
                    source: Box::new(err),
                });
            }
        }
        info!(waypoints = waypoints.len(), "path sent");
        Ok(waypoints.len())
    }

    /// Close the connection.
    pub fn shutdown(&self) -> Result<()> {
        self.session.shutdown().map_err(PeerError::from)
    }

    fn command(&mut self, msg: &Message) -> Result<()> {
        match self.request(msg)? {
            Message::Ok => Ok(()),
            reply @ Message::Error { .. } => Err(PeerError::Rejected(
                reply.reason_text().unwrap_or_default(),
            )),
            other => Err(PeerError::UnexpectedReply(other.kind())),
        }
    }
}
