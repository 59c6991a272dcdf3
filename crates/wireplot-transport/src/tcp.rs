use std::fmt::Display;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::PlotStream;

/// TCP transport.
///
/// The plotter binds and accepts one controller at a time; the controller
/// connects. Both ends get a [`PlotStream`].
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `addr`.
    ///
    /// Port `0` picks a free port; see [`TcpTransport::local_addr`].
    pub fn bind(addr: impl ToSocketAddrs + Display) -> Result<Self> {
        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        info!(%local_addr, "listening for controller");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<PlotStream> {
        let (stream, remote) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%remote, "accepted connection");
        PlotStream::from_tcp(stream)
    }

    /// Connect to a listening plotter (blocking).
    pub fn connect(addr: impl ToSocketAddrs + Display) -> Result<PlotStream> {
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
        debug!(%addr, "connected to plotter");
        PlotStream::from_tcp(stream)
    }

    /// Connect with an upper bound on the time spent per resolved address.
    pub fn connect_timeout(
        addr: impl ToSocketAddrs + Display,
        timeout: Duration,
    ) -> Result<PlotStream> {
        let candidates = addr.to_socket_addrs().map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => {
                    debug!(%candidate, "connected to plotter");
                    return PlotStream::from_tcp(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        match last_err {
            Some(source) => Err(TransportError::Connect {
                addr: addr.to_string(),
                source,
            }),
            None => Err(TransportError::Resolve(addr.to_string())),
        }
    }

    /// The address this transport is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();
        assert_ne!(addr.port(), 0);

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect(addr).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_timeout_reaches_listener() {
        let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || listener.accept().map(|_| ()));

        let client = TcpTransport::connect_timeout(addr, Duration::from_secs(2));
        assert!(client.is_ok());
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to find a port nobody listens on.
        let addr = TcpTransport::bind("127.0.0.1:0").unwrap().local_addr();
        let result = TcpTransport::connect(addr);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_bind_rejects_unparseable_address() {
        let result = TcpTransport::bind("not an address");
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_clone_shares_socket() {
        let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || {
            let mut server = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            server.read_exact(&mut buf).unwrap();
            buf
        });

        let client = TcpTransport::connect(addr).unwrap();
        let mut clone = client.try_clone().unwrap();
        clone.write_all(b"ping").unwrap();
        assert_eq!(&handle.join().unwrap(), b"ping");
        assert_eq!(client.peer_addr().unwrap(), addr);
    }
}
