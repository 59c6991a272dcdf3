use std::path::PathBuf;

use crate::actuator::Side;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent with another.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur while planning or executing motion.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    /// The target lies outside the board.
    #[error("target ({x}, {y}) is outside the {width} x {height} mm board")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    /// The requested speed is not a finite positive step rate.
    #[error("invalid speed {0} steps/s")]
    InvalidSpeed(f64),

    /// A step was attempted while the actuator was disabled.
    #[error("{0} actuator is disabled")]
    ActuatorDisabled(Side),

    /// The pin driver reported a failure while driving an actuator line.
    #[error("{actuator} actuator fault: {detail}")]
    ActuatorFault { actuator: Side, detail: String },

    /// A pin could not be configured as an output.
    #[error("pin {pin} setup failed: {detail}")]
    PinSetup { pin: u8, detail: String },

    /// A path stopped at a failing waypoint.
    #[error("path aborted at waypoint {index} after {completed} moves: {source}")]
    PathAborted {
        index: usize,
        completed: usize,
        #[source]
        source: Box<MotionError>,
    },

    /// Configuration rejected while building the executor.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MotionError {
    /// True when continuing to step would risk drawing with an unknown
    /// actuator state.
    pub fn is_fatal(&self) -> bool {
        match self {
            MotionError::ActuatorDisabled(_)
            | MotionError::ActuatorFault { .. }
            | MotionError::PinSetup { .. } => true,
            MotionError::PathAborted { source, .. } => source.is_fatal(),
            MotionError::OutOfBounds { .. }
            | MotionError::InvalidSpeed(_)
            | MotionError::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MotionError>;
