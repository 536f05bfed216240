//! Port traits: the boundary between the coop core and the outside world.
//!
//! ```text
//!   GPIO adapter ──▶ GpioPort ──▶ Motor / DhtSensor / FanDriver
//!   Coop domain  ──▶ NotificationSink ──▶ delivery adapter (mail, push, …)
//! ```
//!
//! The core never touches hardware directly: drivers and sensors consume
//! a [`GpioPort`] implementation via generics, which keeps the whole
//! crate testable with mock adapters.  All port errors are typed, and
//! callers must handle every variant explicitly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::coop::CoopEvent;
use crate::error::LineError;

/// A numbered digital line.  Line numbers are small non-negative
/// integers assigned by the board layout.
pub type LineId = u8;

/// Direction a line is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Input,
    Output,
}

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

// ───────────────────────────────────────────────────────────────
// Digital-line port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The digital-line capability consumed by every driver and sensor.
///
/// Implementations wrap whatever GPIO layer the deployment uses
/// (memory-mapped registers, `/dev/gpiochip*`, a simulator).  The core
/// issues calls assuming the adapter is already open; per-call failures
/// surface as [`LineError`].
pub trait GpioPort {
    /// Configure a line as input or output.
    fn set_mode(&mut self, line: LineId, mode: LineMode) -> Result<(), LineError>;

    /// Drive an output line high or low.
    fn write(&mut self, line: LineId, level: Level) -> Result<(), LineError>;

    /// Sample the level of an input line.
    fn read(&mut self, line: LineId) -> Result<Level, LineError>;

    /// Enable PWM on a line at the given carrier frequency.
    fn set_pwm_frequency(&mut self, line: LineId, hz: u32) -> Result<(), LineError>;

    /// Set the PWM duty cycle as `numerator / denominator` of a full cycle.
    fn set_duty_cycle(
        &mut self,
        line: LineId,
        numerator: u32,
        denominator: u32,
    ) -> Result<(), LineError>;
}

// ───────────────────────────────────────────────────────────────
// Shared line-access domain
// ───────────────────────────────────────────────────────────────

/// The single mutual-exclusion domain wrapping all line access.
///
/// The physical line subsystem is one shared resource: a motor motion
/// and a sensor capture racing on it is undefined behaviour on real
/// hardware.  Every hardware sequence (configure/drive/poll) runs under
/// one guard acquired from here and held for the full sequence; the
/// guard is released on every exit path, including errors and
/// cancellation.
pub struct GpioBus<P: GpioPort> {
    inner: Arc<Mutex<P>>,
}

impl<P: GpioPort> GpioBus<P> {
    pub fn new(port: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(port)),
        }
    }

    /// Acquire exclusive access to the line subsystem.
    ///
    /// Blocks until every other hardware sequence in flight has
    /// finished.  A poisoned lock (a panic inside a prior sequence)
    /// is reported as [`LineError::Unavailable`].
    pub fn acquire(&self) -> Result<MutexGuard<'_, P>, LineError> {
        self.inner.lock().map_err(|_| LineError::Unavailable)
    }
}

// Manual impl: `P` itself need not be `Clone`.
impl<P: GpioPort> Clone for GpioBus<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Cancellation token
// ───────────────────────────────────────────────────────────────

/// Caller-supplied cancellation signal threaded into motion poll loops.
///
/// Cloning yields a handle to the same flag.  The motor checks the
/// token every poll iteration, with cancellation taking priority over
/// a limit-switch hit so the caller's abort reason stays visible.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the motion in flight.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm the token before a fresh motion.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ───────────────────────────────────────────────────────────────
// Notification sink (driven adapter: domain → delivery)
// ───────────────────────────────────────────────────────────────

/// The coop emits status events through this port.  Delivery mechanics
/// (mail, push service, log line) belong to the adapter.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &CoopEvent);
}

/// Sink that drops every event.  Useful for tests and headless setups.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _event: &CoopEvent) {}
}
