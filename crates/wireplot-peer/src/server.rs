use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use wireplot_frame::{FrameError, Message, MessageConfig, Session};
use wireplot_transport::TcpTransport;

use crate::dispatcher::{Dispatcher, MotionControl};
use crate::error::{PeerError, Result};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const WAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a controller session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The controller closed the connection.
    Closed,
    /// The controller sent bytes that did not decode; an `Error` reply was
    /// attempted before closing.
    ProtocolError(String),
    /// The connection failed.
    Io(String),
    /// The server was asked to stop.
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub peer: Option<SocketAddr>,
    pub messages: u64,
    pub end: SessionEnd,
}

/// Stops a running [`PlotterServer`] from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Request shutdown. A blocked `accept` is woken with a throwaway
    /// connection; an open session notices within one poll interval.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(addr = %self.wake_addr, "waking listener for shutdown");
        let _ = TcpTransport::connect_timeout(self.wake_addr, WAKE_TIMEOUT);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Robot-side listener. Serves one controller at a time on the calling
/// thread, which is also the thread that drives the motors.
pub struct PlotterServer<M: MotionControl> {
    transport: TcpTransport,
    dispatcher: Dispatcher<M>,
    message_config: MessageConfig,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl<M: MotionControl> PlotterServer<M> {
    pub fn bind<A>(addr: A, motion: Arc<M>) -> Result<Self>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let transport = TcpTransport::bind(addr)?;
        info!(addr = %transport.local_addr(), "plotter listening");
        Ok(Self {
            transport,
            dispatcher: Dispatcher::new(motion),
            message_config: MessageConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Override payload limits and write timeout for sessions. The read
    /// timeout is replaced by the shutdown poll interval.
    pub fn with_message_config(mut self, config: MessageConfig) -> Self {
        self.message_config = config;
        self
    }

    /// How often an idle session checks for shutdown.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn dispatcher(&self) -> &Dispatcher<M> {
        &self.dispatcher
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        let mut wake_addr = self.local_addr();
        if wake_addr.ip().is_unspecified() {
            let loopback = match wake_addr {
                SocketAddr::V4(_) => std::net::Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
            };
            wake_addr.set_ip(loopback);
        }
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr,
        }
    }

    /// Accept controllers until shutdown, then release the actuators.
    ///
    /// Returns `Err` if the actuators fault; they are still released first.
    pub fn serve(&mut self) -> Result<()> {
        let outcome = self.serve_until_shutdown();
        let cleanup = self.dispatcher.motion().cleanup();
        info!("plotter stopped");
        outcome?;
        cleanup.map_err(PeerError::from)
    }

    fn serve_until_shutdown(&mut self) -> Result<()> {
        while !self.is_shutdown() {
            match self.serve_one() {
                Ok(summary) => {
                    if summary.end == SessionEnd::Shutdown {
                        break;
                    }
                }
                Err(PeerError::Motion(err)) => {
                    error!(error = %err, "actuator fault; stopping");
                    return Err(PeerError::Motion(err));
                }
                Err(err) if self.is_shutdown() => {
                    debug!(error = %err, "accept interrupted by shutdown");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "failed to start session");
                }
            }
        }
        Ok(())
    }

    /// Accept one controller and serve it until it disconnects.
    pub fn serve_one(&mut self) -> Result<SessionSummary> {
        let stream = self.transport.accept()?;
        if self.is_shutdown() {
            return Ok(SessionSummary {
                peer: stream.peer_addr().ok(),
                messages: 0,
                end: SessionEnd::Shutdown,
            });
        }
        let config = MessageConfig {
            read_timeout: Some(self.poll_interval),
            ..self.message_config.clone()
        };
        let session = Session::with_config(stream, config)?;
        self.run_session(session)
    }

    /// Serve an already-connected session.
    ///
    /// Returns `Err` only when the motion side reports a fatal fault; the
    /// controller receives an `Error` reply first.
    pub fn run_session(&mut self, mut session: Session) -> Result<SessionSummary> {
        let peer = session.peer_addr();
        info!(peer = ?peer, "controller connected");
        let mut messages = 0u64;

        let end = loop {
            if self.is_shutdown() {
                break SessionEnd::Shutdown;
            }

            let msg = match session.receive() {
                Ok(msg) => msg,
                Err(FrameError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(FrameError::ConnectionClosed) => break SessionEnd::Closed,
                Err(err) if err.is_protocol_error() => {
                    warn!(peer = ?peer, error = %err, "undecodable message; closing session");
                    if let Err(send_err) = session.send(&Message::error(err.to_string())) {
                        debug!(error = %send_err, "could not report protocol error");
                    }
                    break SessionEnd::ProtocolError(err.to_string());
                }
                Err(err) => break SessionEnd::Io(err.to_string()),
            };

            messages += 1;
            debug!(kind = %msg.kind(), "received {msg}");
            match self.dispatcher.handle(&msg) {
                Ok(reply) => {
                    if let Err(err) = session.send(&reply) {
                        break SessionEnd::Io(err.to_string());
                    }
                }
                Err(fault) => {
                    if let Err(send_err) = session.send(&Message::error(fault.to_string())) {
                        debug!(error = %send_err, "could not report actuator fault");
                    }
                    let _ = session.shutdown();
                    return Err(fault.into());
                }
            }
        };

        let _ = session.shutdown();
        info!(peer = ?peer, messages, end = ?end, "controller session ended");
        Ok(SessionSummary {
            peer,
            messages,
            end,
        })
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl<M: MotionControl> std::fmt::Debug for PlotterServer<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlotterServer")
            .field("local_addr", &self.local_addr())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
