//! One stepper-driven reel.
//!
//! An [`Actuator`] owns three output lines (step, direction, enable) and a
//! blocking delay provider. It knows how to emit one step pulse; it never
//! decides how many steps to take. The signed step counter is advanced by the
//! caller through [`Actuator::record_step`] after each emitted pulse.

use std::fmt;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::Serialize;

use crate::config::ActuatorPins;
use crate::driver::PinDriver;
use crate::error::{MotionError, Result};

/// Which anchor an actuator hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reel direction. `Forward` shortens the wire and drives the direction
/// line high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// Direction for a signed step delta (positive = shorten). `None` for zero.
    pub fn from_delta(delta: i64) -> Option<Direction> {
        match delta.signum() {
            1 => Some(Direction::Forward),
            -1 => Some(Direction::Reverse),
            _ => None,
        }
    }

    /// Counter change for one step in this direction; follows the sign of
    /// the step delta, so reeling in counts up.
    pub fn step_increment(&self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// The three output lines of one actuator.
pub struct ActuatorLines<P> {
    pub step: P,
    pub dir: P,
    pub enable: P,
}

impl<P> ActuatorLines<P> {
    /// Claim the configured pins from a driver.
    pub fn claim<D>(driver: &mut D, pins: &ActuatorPins) -> Result<Self>
    where
        D: PinDriver<Pin = P>,
    {
        Ok(Self {
            step: driver.output(pins.step_pin)?,
            dir: driver.output(pins.dir_pin)?,
            enable: driver.output(pins.enable_pin)?,
        })
    }
}

pub struct Actuator<P: OutputPin, D: DelayNs> {
    side: Side,
    lines: ActuatorLines<P>,
    delay: D,
    enable_active_low: bool,
    enabled: bool,
    direction: Option<Direction>,
    position: i64,
    released: bool,
}

impl<P: OutputPin, D: DelayNs> Actuator<P, D> {
    /// Take ownership of the lines and put them in a safe state: step low,
    /// driver disabled.
    pub fn new(
        side: Side,
        lines: ActuatorLines<P>,
        delay: D,
        enable_active_low: bool,
    ) -> Result<Self> {
        let mut actuator = Self {
            side,
            lines,
            delay,
            enable_active_low,
            enabled: false,
            direction: None,
            position: 0,
            released: false,
        };
        actuator.lines.step.set_low().map_err(fault(side))?;
        actuator.write_enable(false)?;
        Ok(actuator)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Drive the direction line. Repeating the current direction is a no-op.
    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        if self.direction == Some(direction) {
            return Ok(());
        }
        let written = match direction {
            Direction::Forward => self.lines.dir.set_high(),
            Direction::Reverse => self.lines.dir.set_low(),
        };
        written.map_err(fault(self.side))?;
        self.direction = Some(direction);
        Ok(())
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Emit one step pulse: high for `half_period`, then low for
    /// `half_period`. Blocks for the whole pulse.
    pub fn step_once(&mut self, half_period: Duration) -> Result<()> {
        if !self.enabled {
            return Err(MotionError::ActuatorDisabled(self.side));
        }
        self.lines.step.set_high().map_err(fault(self.side))?;
        hold(&mut self.delay, half_period);
        self.lines.step.set_low().map_err(fault(self.side))?;
        hold(&mut self.delay, half_period);
        Ok(())
    }

    pub fn enable(&mut self) -> Result<()> {
        self.write_enable(true)?;
        self.released = false;
        Ok(())
    }

    pub fn disable(&mut self) -> Result<()> {
        self.write_enable(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Signed step counter.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Account for one pulse emitted in `direction`.
    pub fn record_step(&mut self, direction: Direction) {
        self.position += direction.step_increment();
    }

    /// Overwrite the step counter after a position re-sync.
    pub fn reset_position(&mut self, steps: i64) {
        self.position = steps;
    }

    /// Disable the driver and leave the step line low. Both lines are
    /// attempted even if the first write fails.
    pub fn cleanup(&mut self) -> Result<()> {
        let disabled = self.write_enable(false);
        let step_low = self.lines.step.set_low().map_err(fault(self.side));
        self.released = true;
        tracing::debug!(actuator = %self.side, position = self.position, "actuator released");
        disabled.and(step_low)
    }

    fn write_enable(&mut self, enabled: bool) -> Result<()> {
        let high = enabled != self.enable_active_low;
        let written = if high {
            self.lines.enable.set_high()
        } else {
            self.lines.enable.set_low()
        };
        written.map_err(fault(self.side))?;
        self.enabled = enabled;
        Ok(())
    }
}

impl<P: OutputPin, D: DelayNs> Drop for Actuator<P, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.cleanup() {
            tracing::warn!(actuator = %self.side, error = %err, "actuator cleanup on drop failed");
        }
    }
}

impl<P: OutputPin, D: DelayNs> fmt::Debug for Actuator<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actuator")
            .field("side", &self.side)
            .field("enabled", &self.enabled)
            .field("direction", &self.direction)
            .field("position", &self.position)
            .finish()
    }
}

fn fault<E: fmt::Debug>(side: Side) -> impl Fn(E) -> MotionError {
    move |err| MotionError::ActuatorFault {
        actuator: side,
        detail: format!("{err:?}"),
    }
}

/// `DelayNs` takes `u32` nanoseconds (about 4.29 s); longer holds are split.
fn hold<D: DelayNs>(delay: &mut D, duration: Duration) {
    let mut remaining = duration.as_nanos();
    while remaining > 0 {
        let chunk = remaining.min(u128::from(u32::MAX)) as u32;
        delay.delay_ns(chunk);
        remaining -= u128::from(chunk);
    }
}
