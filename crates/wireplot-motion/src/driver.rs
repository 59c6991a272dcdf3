//! Hardware capability seams.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::Result;

/// Hands out output lines by pin number.
///
/// Board support crates implement this over their GPIO peripheral; the
/// actuator only ever sees the returned [`OutputPin`] handles.
pub trait PinDriver {
    type Pin: OutputPin;

    /// Configure `pin` as an output and return its handle.
    ///
    /// Fails with `MotionError::PinSetup` if the pin is unavailable or
    /// already claimed.
    fn output(&mut self, pin: u8) -> Result<Self::Pin>;
}

/// Blocking delay on the host scheduler. Pulse timing jitter is whatever
/// `std::thread::sleep` gives on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
