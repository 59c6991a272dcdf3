//! Simulated pins and time for running without GPIO hardware.
//!
//! [`SimulatedDriver`] hands out [`SimulatedPin`]s that record every level
//! change into a shared [`PinLog`], timestamped either by a [`VirtualClock`]
//! or by wall time. [`SimulatedDelay`] advances a virtual clock instead of
//! sleeping, so a full move completes instantly while keeping exact pulse
//! timing for inspection.

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::driver::PinDriver;
use crate::error::{MotionError, Result};

/// Shared monotonic clock advanced only by [`SimulatedDelay`].
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    nanos: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    pub fn advance(&self, ns: u64) {
        self.nanos.fetch_add(ns, Ordering::SeqCst);
    }
}

/// Delay provider that advances a [`VirtualClock`] and returns immediately.
#[derive(Debug, Clone)]
pub struct SimulatedDelay {
    clock: VirtualClock,
}

impl SimulatedDelay {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }
}

impl DelayNs for SimulatedDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(u64::from(ns));
    }
}

#[derive(Debug, Clone)]
enum Timebase {
    Virtual(VirtualClock),
    Wall(Instant),
}

impl Timebase {
    fn now(&self) -> Duration {
        match self {
            Timebase::Virtual(clock) => clock.now(),
            Timebase::Wall(start) => start.elapsed(),
        }
    }
}

/// One recorded level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
    pub pin: u8,
    pub high: bool,
    pub at: Duration,
}

/// Shared record of pin activity.
///
/// Recording is optional: a long-running host keeps only the current level
/// of each pin.
#[derive(Debug, Clone, Default)]
pub struct PinLog {
    inner: Arc<Mutex<PinLogInner>>,
}

#[derive(Debug, Default)]
struct PinLogInner {
    record: bool,
    events: Vec<PinEvent>,
    levels: HashMap<u8, bool>,
    transitions: HashMap<u8, u64>,
}

impl PinLog {
    fn new(record: bool) -> Self {
        let log = Self::default();
        log.lock().record = record;
        log
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PinLogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, pin: u8, high: bool, at: Duration) {
        let mut inner = self.lock();
        if inner.levels.insert(pin, high) != Some(high) {
            *inner.transitions.entry(pin).or_default() += 1;
        }
        if inner.record {
            inner.events.push(PinEvent { pin, high, at });
        }
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> Vec<PinEvent> {
        self.lock().events.clone()
    }

    /// Current level of `pin`, if it has ever been driven.
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.lock().levels.get(&pin).copied()
    }

    /// Number of level changes on `pin` (including its first write).
    pub fn transitions(&self, pin: u8) -> u64 {
        self.lock().transitions.get(&pin).copied().unwrap_or(0)
    }

    pub fn rising_edges(&self, pin: u8) -> Vec<Duration> {
        self.edges(pin, true)
    }

    pub fn falling_edges(&self, pin: u8) -> Vec<Duration> {
        self.edges(pin, false)
    }

    fn edges(&self, pin: u8, rising: bool) -> Vec<Duration> {
        let inner = self.lock();
        // Lines power up low.
        let mut was_high = false;
        let mut edges = Vec::new();
        for event in inner.events.iter().filter(|e| e.pin == pin) {
            if event.high == rising && was_high != rising {
                edges.push(event.at);
            }
            was_high = event.high;
        }
        edges
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }
}

/// An output line that records its writes.
#[derive(Debug)]
pub struct SimulatedPin {
    pin: u8,
    log: PinLog,
    time: Timebase,
}

impl SimulatedPin {
    pub fn pin(&self) -> u8 {
        self.pin
    }

    fn write(&mut self, high: bool) {
        let at = self.time.now();
        tracing::trace!(pin = self.pin, high, at_ns = at.as_nanos() as u64, "pin write");
        self.log.push(self.pin, high, at);
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

/// Pin driver for hosts without GPIO.
#[derive(Debug)]
pub struct SimulatedDriver {
    log: PinLog,
    time: Timebase,
    claimed: BTreeSet<u8>,
}

impl SimulatedDriver {
    /// Timestamps from `clock`; every event is kept.
    pub fn with_clock(clock: VirtualClock) -> Self {
        Self {
            log: PinLog::new(true),
            time: Timebase::Virtual(clock),
            claimed: BTreeSet::new(),
        }
    }

    /// Wall-clock timestamps; only current levels are kept.
    pub fn wall_clock() -> Self {
        Self {
            log: PinLog::new(false),
            time: Timebase::Wall(Instant::now()),
            claimed: BTreeSet::new(),
        }
    }

    pub fn log(&self) -> PinLog {
        self.log.clone()
    }

    pub fn claimed(&self) -> impl Iterator<Item = u8> + '_ {
        self.claimed.iter().copied()
    }
}

impl PinDriver for SimulatedDriver {
    type Pin = SimulatedPin;

    fn output(&mut self, pin: u8) -> Result<SimulatedPin> {
        if !self.claimed.insert(pin) {
            return Err(MotionError::PinSetup {
                pin,
                detail: "already claimed".to_string(),
            });
        }
        tracing::debug!(pin, "configured simulated output");
        Ok(SimulatedPin {
            pin,
            log: self.log.clone(),
            time: self.time.clone(),
        })
    }
}
