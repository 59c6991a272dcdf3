//! Both ends of a plotter connection.
//!
//! The robot side runs a [`PlotterServer`] that accepts one controller at a
//! time and feeds every message through a [`Dispatcher`] into the motion
//! executor. The controller side uses [`Controller`] to send targets and wait
//! for each acknowledgement.

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod server;

pub use controller::Controller;
pub use dispatcher::{Dispatcher, MotionControl};
pub use error::{PeerError, Result};
pub use server::{PlotterServer, SessionEnd, SessionSummary, ShutdownHandle};
