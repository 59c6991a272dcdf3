//! Kinematics and synchronized motion for a two-wire suspended marker.
//!
//! The marker hangs from two wires anchored at the top corners of the board.
//! [`Kinematics`] turns board coordinates into per-reel step counts,
//! [`Actuator`] drives one stepper reel through `embedded-hal` output lines,
//! and [`MotionExecutor`] steps both reels so the marker travels in a
//! straight line between waypoints.
//!
//! Pin access goes through [`PinDriver`]; [`sim`] provides a recording
//! driver and a virtual clock so everything runs without GPIO hardware.

pub mod actuator;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod kinematics;
pub mod sim;

pub use actuator::{Actuator, ActuatorLines, Direction, Side};
pub use config::{
    ActuatorPins, BoardConfig, MotionConfig, MotorConfig, NetworkConfig, PlotterConfig,
};
pub use driver::{PinDriver, StdDelay};
pub use error::{ConfigError, MotionError, Result};
pub use executor::{AxisPlan, MoveOutcome, MovePlan, MotionExecutor};
pub use kinematics::{Kinematics, Point, StepCounts, WireLengths};
