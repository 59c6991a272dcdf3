//! Synchronized two-actuator motion.
//!
//! A move converts the current and target positions to step counts, scales
//! each actuator's step rate by its share of the travel, and interleaves the
//! two pulse trains by due time so both reels finish together and the marker
//! follows a straight line.

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actuator::{Actuator, ActuatorLines, Direction, Side};
use crate::config::PlotterConfig;
use crate::driver::PinDriver;
use crate::error::{MotionError, Result};
use crate::kinematics::{interpolate_line, Kinematics, Point, StepCounts};

/// Pulse schedule for one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisPlan {
    pub steps: u64,
    pub direction: Option<Direction>,
    /// Steps per second; zero when the actuator does not move.
    pub speed: f64,
    pub half_period: Duration,
}

impl AxisPlan {
    fn new(delta: i64, max_steps: u64, requested: f64) -> Result<Self> {
        let steps = delta.unsigned_abs();
        if steps == 0 {
            return Ok(Self {
                steps,
                direction: None,
                speed: 0.0,
                half_period: Duration::ZERO,
            });
        }
        let speed = steps as f64 / max_steps as f64 * requested;
        let half_period = Duration::try_from_secs_f64(1.0 / (2.0 * speed))
            .map_err(|_| MotionError::InvalidSpeed(requested))?;
        Ok(Self {
            steps,
            direction: Direction::from_delta(delta),
            speed,
            half_period,
        })
    }

    /// Time spent emitting every pulse of this axis.
    pub fn busy_time(&self) -> Duration {
        self.half_period.saturating_mul(2).saturating_mul(
            u32::try_from(self.steps).unwrap_or(u32::MAX),
        )
    }
}

/// Rate-matched schedule for one coordinated move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovePlan {
    pub delta: StepCounts,
    pub left: AxisPlan,
    pub right: AxisPlan,
}

impl MovePlan {
    /// Scale `speed` (steps/s of the longer-travel actuator) so both
    /// actuators cover their travel in the same time.
    pub fn new(delta: StepCounts, speed: f64) -> Result<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(MotionError::InvalidSpeed(speed));
        }
        let max_steps = delta.max_abs();
        Ok(Self {
            delta,
            left: AxisPlan::new(delta.left, max_steps, speed)?,
            right: AxisPlan::new(delta.right, max_steps, speed)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.left.steps == 0 && self.right.steps == 0
    }

    /// Which actuator pulses next after `taken_left` and `taken_right`
    /// pulses, or `None` when both are done.
    ///
    /// The next pulse of an actuator is due at `(k + 1) / steps` of the move;
    /// due times are compared as `(k_l + 1) * n_r` against `(k_r + 1) * n_l`
    /// so no rounding can reorder them. Ties go to the left actuator.
    pub fn next_side(&self, taken_left: u64, taken_right: u64) -> Option<Side> {
        let left_pending = taken_left < self.left.steps;
        let right_pending = taken_right < self.right.steps;
        match (left_pending, right_pending) {
            (false, false) => None,
            (true, false) => Some(Side::Left),
            (false, true) => Some(Side::Right),
            (true, true) => {
                let left_due = u128::from(taken_left + 1) * u128::from(self.right.steps);
                let right_due = u128::from(taken_right + 1) * u128::from(self.left.steps);
                if left_due <= right_due {
                    Some(Side::Left)
                } else {
                    Some(Side::Right)
                }
            }
        }
    }

    /// Expected wall time: pulses are emitted one at a time.
    pub fn duration(&self) -> Duration {
        self.left.busy_time().saturating_add(self.right.busy_time())
    }
}

/// Summary of a completed move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveOutcome {
    pub from: Point,
    pub to: Point,
    pub delta: StepCounts,
}

struct MotionState<P: OutputPin, D: DelayNs> {
    position: Point,
    left: Actuator<P, D>,
    right: Actuator<P, D>,
}

impl<P: OutputPin, D: DelayNs> MotionState<P, D> {
    fn run(&mut self, plan: &MovePlan) -> Result<()> {
        self.left.enable()?;
        self.right.enable()?;
        if plan.is_empty() {
            return Ok(());
        }
        if let Some(direction) = plan.left.direction {
            self.left.set_direction(direction)?;
        }
        if let Some(direction) = plan.right.direction {
            self.right.set_direction(direction)?;
        }

        let (mut taken_left, mut taken_right) = (0u64, 0u64);
        while let Some(side) = plan.next_side(taken_left, taken_right) {
            let (actuator, axis, taken) = match side {
                Side::Left => (&mut self.left, &plan.left, &mut taken_left),
                Side::Right => (&mut self.right, &plan.right, &mut taken_right),
            };
            actuator.step_once(axis.half_period)?;
            if let Some(direction) = axis.direction {
                actuator.record_step(direction);
            }
            *taken += 1;
        }
        Ok(())
    }

    fn step_positions(&self) -> StepCounts {
        StepCounts {
            left: self.left.position(),
            right: self.right.position(),
        }
    }

    fn resync(&mut self, position: Point, steps: StepCounts) {
        self.position = position;
        self.left.reset_position(steps.left);
        self.right.reset_position(steps.right);
    }
}

/// Owns both actuators and the marker position.
///
/// Every operation that moves or re-syncs the marker holds one mutex for its
/// whole duration, so concurrent callers queue rather than interleave pulses.
/// The marker starts at the board center.
pub struct MotionExecutor<P: OutputPin, D: DelayNs> {
    kinematics: Kinematics,
    max_speed: f64,
    path_pause: Duration,
    line_segments: u32,
    state: Mutex<MotionState<P, D>>,
}

impl<P: OutputPin, D: DelayNs> MotionExecutor<P, D> {
    pub fn new(
        config: &PlotterConfig,
        left: Actuator<P, D>,
        right: Actuator<P, D>,
    ) -> Result<Self> {
        config.validate()?;
        let kinematics = Kinematics::from_config(config);
        let home = kinematics.center();
        let mut state = MotionState {
            position: home,
            left,
            right,
        };
        state.resync(home, StepCounts::ZERO);

        info!(
            width = kinematics.width(),
            height = kinematics.height(),
            steps_per_mm = kinematics.steps_per_mm(),
            "motion executor ready"
        );

        Ok(Self {
            kinematics,
            max_speed: config.motion.max_speed,
            path_pause: config.path_pause(),
            line_segments: config.motion.line_segments,
            state: Mutex::new(state),
        })
    }

    /// Claim both actuators' pins from `driver` and build the executor.
    pub fn from_driver<R>(config: &PlotterConfig, driver: &mut R, delay: D) -> Result<Self>
    where
        R: PinDriver<Pin = P>,
        D: Clone,
    {
        config.validate()?;
        let active_low = config.motor.enable_active_low;
        let left = Actuator::new(
            Side::Left,
            ActuatorLines::claim(driver, &config.left)?,
            delay.clone(),
            active_low,
        )?;
        let right = Actuator::new(
            Side::Right,
            ActuatorLines::claim(driver, &config.right)?,
            delay,
            active_low,
        )?;
        Self::new(config, left, right)
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn line_segments(&self) -> u32 {
        self.line_segments
    }

    /// Move at the configured maximum speed.
    pub fn move_to(&self, x: f64, y: f64) -> Result<MoveOutcome> {
        self.move_to_with_speed(x, y, self.max_speed)
    }

    /// Move in a straight line to `(x, y)`; `speed` is the step rate of the
    /// actuator with the longer travel.
    ///
    /// Blocks until every pulse has been emitted. On an actuator fault the
    /// position is left unchanged and the step counters reflect the pulses
    /// that were emitted.
    pub fn move_to_with_speed(&self, x: f64, y: f64, speed: f64) -> Result<MoveOutcome> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(MotionError::InvalidSpeed(speed));
        }
        self.check_bounds(x, y)?;

        let target = Point::new(x, y);
        let mut state = self.lock();
        let from = state.position;
        let delta = self.kinematics.delta_steps(from, target);
        let plan = MovePlan::new(delta, speed)?;

        info!(x, y, from_x = from.x, from_y = from.y, "moving");
        debug!(
            left = delta.left,
            right = delta.right,
            left_speed = plan.left.speed,
            right_speed = plan.right.speed,
            "planned move"
        );

        state.run(&plan)?;
        state.position = target;

        info!(
            x,
            y,
            left = state.left.position(),
            right = state.right.position(),
            "move complete"
        );
        Ok(MoveOutcome {
            from,
            to: target,
            delta,
        })
    }

    /// Visit `waypoints` in order, pausing between them.
    ///
    /// Stops at the first waypoint that fails; earlier moves stay done.
    pub fn execute_path(&self, waypoints: &[Point]) -> Result<usize> {
        self.follow(waypoints, self.path_pause)
    }

    /// Draw a straight segment as `segments` short moves, starting with a
    /// move to `from`.
    pub fn draw_line(&self, from: Point, to: Point, segments: u32) -> Result<usize> {
        self.follow(&interpolate_line(from, to, segments), Duration::ZERO)
    }

    /// Trace the calibration rectangle and diagonals inset by `margin`.
    pub fn draw_test_pattern(&self, margin: f64) -> Result<usize> {
        let pattern = self.kinematics.test_pattern(margin);
        info!(margin, waypoints = pattern.len(), "drawing test pattern");
        self.execute_path(&pattern)
    }

    /// Return to the board center.
    pub fn home(&self) -> Result<MoveOutcome> {
        let center = self.kinematics.center();
        self.move_to(center.x, center.y)
    }

    pub fn position(&self) -> Point {
        self.lock().position
    }

    /// Net steps each actuator has taken since the marker was at the board
    /// center, signed like the move deltas (positive = reeled in).
    pub fn step_positions(&self) -> StepCounts {
        self.lock().step_positions()
    }

    /// Counter values for a marker at `(x, y)`.
    pub fn steps_at(&self, x: f64, y: f64) -> StepCounts {
        self.kinematics
            .delta_steps(self.kinematics.center(), Point::new(x, y))
    }

    /// Declare the marker to be at `(x, y)` without moving, resetting both
    /// step counters to match.
    pub fn set_position(&self, x: f64, y: f64) -> Result<()> {
        self.check_bounds(x, y)?;
        let steps = self.steps_at(x, y);
        let mut state = self.lock();
        state.resync(Point::new(x, y), steps);
        info!(x, y, left = steps.left, right = steps.right, "position re-synced");
        Ok(())
    }

    /// True while another caller holds the motion lock.
    pub fn is_busy(&self) -> bool {
        matches!(self.state.try_lock(), Err(TryLockError::WouldBlock))
    }

    /// Disable and release both actuators. Waits for any move in progress.
    pub fn cleanup(&self) -> Result<()> {
        let mut state = self.lock();
        let left = state.left.cleanup();
        let right = state.right.cleanup();
        info!("actuators released");
        left.and(right)
    }

    fn follow(&self, waypoints: &[Point], pause: Duration) -> Result<usize> {
        for (index, point) in waypoints.iter().enumerate() {
            if index > 0 && !pause.is_zero() {
                std::thread::sleep(pause);
            }
            if let Err(source) = self.move_to(point.x, point.y) {
                warn!(index, error = %source, "path aborted");
                return Err(MotionError::PathAborted {
                    index,
                    completed: index,
                    source: Box::new(source),
                });
            }
        }
        info!(waypoints = waypoints.len(), "path complete");
        Ok(waypoints.len())
    }

    fn check_bounds(&self, x: f64, y: f64) -> Result<()> {
        if self.kinematics.is_in_bounds(x, y) {
            return Ok(());
        }
        warn!(x, y, "target outside board");
        Err(MotionError::OutOfBounds {
            x,
            y,
            width: self.kinematics.width(),
            height: self.kinematics.height(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, MotionState<P, D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: OutputPin, D: DelayNs> std::fmt::Debug for MotionExecutor<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionExecutor")
            .field("kinematics", &self.kinematics)
            .field("max_speed", &self.max_speed)
            .field("path_pause", &self.path_pause)
            .finish_non_exhaustive()
    }
}
