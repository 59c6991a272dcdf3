//! Byte-stream transport between the plotter and its remote controller.
//!
//! The wire protocol only needs a reliable, ordered byte stream. This crate
//! provides that over TCP and is the lowest layer of wireplot: everything
//! else builds on the [`PlotStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::PlotStream;
pub use tcp::TcpTransport;
