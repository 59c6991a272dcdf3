use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use tracing::{info, warn};
use wireplot_frame::Message;
use wireplot_motion::{MotionError, MotionExecutor, MoveOutcome};

/// What the dispatcher needs from the motion side.
pub trait MotionControl {
    fn move_to(&self, x: f64, y: f64) -> Result<MoveOutcome, MotionError>;

    fn set_position(&self, x: f64, y: f64) -> Result<(), MotionError>;

    fn cleanup(&self) -> Result<(), MotionError>;
}

impl<P: OutputPin, D: DelayNs> MotionControl for MotionExecutor<P, D> {
    fn move_to(&self, x: f64, y: f64) -> Result<MoveOutcome, MotionError> {
        MotionExecutor::move_to(self, x, y)
    }

    fn set_position(&self, x: f64, y: f64) -> Result<(), MotionError> {
        MotionExecutor::set_position(self, x, y)
    }

    fn cleanup(&self) -> Result<(), MotionError> {
        MotionExecutor::cleanup(self)
    }
}

/// Maps inbound controller messages to motion calls and replies.
///
/// Every inbound message gets exactly one reply. Rejected targets become an
/// `Error` reply; only faults that leave the actuators in an unknown state
/// are returned as `Err`.
pub struct Dispatcher<M> {
    motion: Arc<M>,
    pen_down: bool,
}

impl<M: MotionControl> Dispatcher<M> {
    pub fn new(motion: Arc<M>) -> Self {
        Self {
            motion,
            pen_down: false,
        }
    }

    pub fn motion(&self) -> &Arc<M> {
        &self.motion
    }

    /// Last pen state requested by the controller.
    pub fn pen_down(&self) -> bool {
        self.pen_down
    }

    /// Handle one message and produce its reply.
    ///
    /// Returns `Err` only for fatal motion errors; the caller should report
    /// the error to the controller and stop serving.
    pub fn handle(&mut self, msg: &Message) -> Result<Message, MotionError> {
        match msg {
            Message::GotoPos { x, y } => self.reply(self.motion.move_to(*x, *y).map(|_| ())),
            Message::CurrentPos { x, y } => self.reply(self.motion.set_position(*x, *y)),
            Message::PenUpdown { down } => {
                self.pen_down = *down;
                info!(down = *down, "pen state changed");
                Ok(Message::Ok)
            }
            Message::Ok | Message::Error { .. } => {
                warn!(kind = %msg.kind(), "unexpected message from controller");
                Ok(Message::error(format!("unexpected {} message", msg.kind())))
            }
        }
    }

    fn reply(&self, result: Result<(), MotionError>) -> Result<Message, MotionError> {
        match result {
            Ok(()) => Ok(Message::Ok),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => Ok(Message::error(err.to_string())),
        }
    }
}

impl<M> std::fmt::Debug for Dispatcher<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pen_down", &self.pen_down)
            .finish_non_exhaustive()
    }
}
