//! Two-wire whiteboard plotter.
//!
//! A marker hangs from two stepper-driven wires anchored at the top corners
//! of a board. A remote controller sends target coordinates over TCP; the
//! plotter converts them to wire lengths and steps both reels so the marker
//! moves in a straight line.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP byte stream between controller and plotter
//! - [`frame`]: length-prefixed message protocol with magic-byte resync
//! - [`motion`]: configuration, kinematics, actuators and the motion executor
//! - [`peer`]: plotter server and controller client (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use wireplot_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wireplot_frame::*;
}

/// Re-export motion types.
pub mod motion {
    pub use wireplot_motion::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use wireplot_peer::*;
}
