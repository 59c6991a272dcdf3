use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected byte stream between controller and plotter.
///
/// This is the fundamental I/O type returned by transport operations. The
/// protocol layer only relies on `Read + Write`, so any reliable ordered
/// stream could back it.
pub struct PlotStream {
    inner: PlotStreamInner,
}

enum PlotStreamInner {
    Tcp(TcpStream),
}

impl Read for PlotStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            PlotStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for PlotStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            PlotStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            PlotStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl PlotStream {
    /// Wrap a connected TCP stream.
    ///
    /// Nagle is disabled: frames are tiny and every request waits on a reply.
    pub(crate) fn from_tcp(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self {
            inner: PlotStreamInner::Tcp(stream),
        })
    }

    /// Set read timeout on the underlying stream. `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            PlotStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream. `None` blocks indefinitely.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            PlotStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new handle to the same socket).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            PlotStreamInner::Tcp(stream) => Ok(Self {
                inner: PlotStreamInner::Tcp(stream.try_clone()?),
            }),
        }
    }

    /// Address of the remote end.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        match &self.inner {
            PlotStreamInner::Tcp(stream) => stream.peer_addr().map_err(Into::into),
        }
    }

    /// Shut down both halves of the connection.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            PlotStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
        }
    }
}

impl std::fmt::Debug for PlotStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            PlotStreamInner::Tcp(stream) => f
                .debug_struct("PlotStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
        }
    }
}
