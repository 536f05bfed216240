//! The door: one motor plus configured motion durations.
//!
//! The durations are software safety bounds independent of the limit
//! switches.  Switches can fail to trigger (misalignment, wear), and an
//! unbounded motor run is itself a hazard, so every motion carries a
//! deadline derived from the configured duration.  This layer adds no
//! retry; motor errors propagate unchanged.

use std::time::{Duration, Instant};

use log::info;

use crate::drivers::motor::Motor;
use crate::error::MotorError;
use crate::ports::{CancelToken, GpioPort};

pub struct Door<P: GpioPort> {
    motor: Motor<P>,
    opening: Duration,
    closing: Duration,
}

impl<P: GpioPort> Door<P> {
    pub fn new(motor: Motor<P>, opening: Duration, closing: Duration) -> Self {
        Self {
            motor,
            opening,
            closing,
        }
    }

    /// Drive the door open, bounded by the configured opening duration.
    pub fn open(&self, cancel: &CancelToken) -> Result<(), MotorError> {
        info!("opening the door (safety bound {:?})", self.opening);
        let deadline = Instant::now() + self.opening;
        self.motor.forward(deadline, cancel)
    }

    /// Drive the door closed, bounded by the configured closing duration.
    pub fn close(&self, cancel: &CancelToken) -> Result<(), MotorError> {
        info!("closing the door (safety bound {:?})", self.closing);
        let deadline = Instant::now() + self.closing;
        self.motor.backward(deadline, cancel)
    }

    /// Cut motor power immediately.
    pub fn stop(&self) -> Result<(), MotorError> {
        self.motor.stop()
    }
}
