//! DC motor driver for the door H-bridge.
//!
//! Three interchangeable board wirings (L298N, L293D, BTS7960) share one
//! contract: `forward` / `backward` run the motor until a limit switch
//! asserts, the deadline passes, or the caller cancels; `stop` drops the
//! duty cycle unconditionally.  The poll/cancel/timeout loop is factored
//! once and parameterised by the wiring's direction encoding.
//!
//! ## Safety contract
//!
//! Every motion holds the [`GpioBus`] guard for its whole line sequence,
//! and every exit path (limit hit, timeout, cancellation, line failure)
//! drops the duty cycle to zero before returning.

use core::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::MotorConfig;
use crate::error::{LineError, MotorError};
use crate::ports::{CancelToken, GpioBus, GpioPort, Level, LineId, LineMode};

/// PWM carrier frequency for the enable lines.
pub const PWM_FREQUENCY_HZ: u32 = 5_000;

/// Duty cycles are expressed out of this denominator.
const DUTY_DENOMINATOR: u32 = 100;

/// Limit-switch / deadline / cancellation poll granularity.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Board wirings
// ───────────────────────────────────────────────────────────────

/// Line assignments for one H-bridge board.
///
/// The L298N and L293D share a topology: two direction-select inputs
/// and one PWM enable.  The BTS7960 is two half-bridges, one PWM line
/// per direction plus an enable each.
#[derive(Debug, Clone, Copy)]
pub enum MotorPins {
    L298n {
        in1: LineId,
        in2: LineId,
        enable: LineId,
    },
    L293d {
        in1: LineId,
        in2: LineId,
        enable: LineId,
    },
    Bts7960 {
        forward_pwm: LineId,
        backward_pwm: LineId,
        forward_enable: LineId,
        backward_enable: LineId,
    },
}

impl From<&MotorConfig> for MotorPins {
    fn from(config: &MotorConfig) -> Self {
        match *config {
            MotorConfig::L298n {
                pin_1a,
                pin_1b,
                pin_enable1,
            } => Self::L298n {
                in1: pin_1a,
                in2: pin_1b,
                enable: pin_enable1,
            },
            MotorConfig::L293d {
                pin_1a,
                pin_1b,
                pin_enable1,
            } => Self::L293d {
                in1: pin_1a,
                in2: pin_1b,
                enable: pin_enable1,
            },
            MotorConfig::Bts7960 {
                forward_pwm,
                backward_pwm,
                forward_enable,
                backward_enable,
            } => Self::Bts7960 {
                forward_pwm,
                backward_pwm,
                forward_enable,
                backward_enable,
            },
        }
    }
}

impl MotorPins {
    /// Configure every line and encode the rotation direction.  Leaves
    /// the duty cycle at zero; the motor is not moving yet.
    fn engage<P: GpioPort>(&self, port: &mut P, direction: Direction) -> Result<(), LineError> {
        match *self {
            Self::L298n { in1, in2, enable } | Self::L293d { in1, in2, enable } => {
                port.set_mode(in1, LineMode::Output)?;
                port.set_mode(in2, LineMode::Output)?;
                port.set_mode(enable, LineMode::Output)?;
                port.set_pwm_frequency(enable, PWM_FREQUENCY_HZ)?;
                port.set_duty_cycle(enable, 0, DUTY_DENOMINATOR)?;

                let (a, b) = match direction {
                    Direction::Forward => (Level::High, Level::Low),
                    Direction::Backward => (Level::Low, Level::High),
                };
                port.write(in1, a)?;
                port.write(in2, b)?;
            }
            Self::Bts7960 {
                forward_pwm,
                backward_pwm,
                forward_enable,
                backward_enable,
            } => {
                for line in [forward_pwm, backward_pwm, forward_enable, backward_enable] {
                    port.set_mode(line, LineMode::Output)?;
                }
                port.set_pwm_frequency(forward_pwm, PWM_FREQUENCY_HZ)?;
                port.set_pwm_frequency(backward_pwm, PWM_FREQUENCY_HZ)?;
                port.set_duty_cycle(forward_pwm, 0, DUTY_DENOMINATOR)?;
                port.set_duty_cycle(backward_pwm, 0, DUTY_DENOMINATOR)?;
                port.write(forward_enable, Level::High)?;
                port.write(backward_enable, Level::High)?;
            }
        }
        Ok(())
    }

    /// Apply `duty / 100` on the line that powers `direction`.  On the
    /// BTS7960 the opposite half-bridge is forced to zero.
    fn set_duty<P: GpioPort>(
        &self,
        port: &mut P,
        direction: Direction,
        duty: u32,
    ) -> Result<(), LineError> {
        match *self {
            Self::L298n { enable, .. } | Self::L293d { enable, .. } => {
                port.set_duty_cycle(enable, duty, DUTY_DENOMINATOR)
            }
            Self::Bts7960 {
                forward_pwm,
                backward_pwm,
                ..
            } => {
                let (drive, idle) = match direction {
                    Direction::Forward => (forward_pwm, backward_pwm),
                    Direction::Backward => (backward_pwm, forward_pwm),
                };
                port.set_duty_cycle(idle, 0, DUTY_DENOMINATOR)?;
                port.set_duty_cycle(drive, duty, DUTY_DENOMINATOR)
            }
        }
    }

    /// Unconditionally force every powered line to zero duty.
    fn halt<P: GpioPort>(&self, port: &mut P) -> Result<(), LineError> {
        match *self {
            Self::L298n { enable, .. } | Self::L293d { enable, .. } => {
                port.set_mode(enable, LineMode::Output)?;
                port.set_pwm_frequency(enable, PWM_FREQUENCY_HZ)?;
                port.set_duty_cycle(enable, 0, DUTY_DENOMINATOR)
            }
            Self::Bts7960 {
                forward_pwm,
                backward_pwm,
                ..
            } => {
                for line in [forward_pwm, backward_pwm] {
                    port.set_mode(line, LineMode::Output)?;
                    port.set_pwm_frequency(line, PWM_FREQUENCY_HZ)?;
                    port.set_duty_cycle(line, 0, DUTY_DENOMINATOR)?;
                }
                Ok(())
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Motor
// ───────────────────────────────────────────────────────────────

/// Limit-switch input lines, one per travel direction (active low).
#[derive(Debug, Clone, Copy)]
pub struct LimitSwitches {
    pub open_pin: LineId,
    pub close_pin: LineId,
}

/// Per-direction duty cycles (out of 100).
#[derive(Debug, Clone, Copy)]
pub struct DutyCycles {
    pub opening: u32,
    pub closing: u32,
}

/// One door motor.  Stateless between calls except for the electrical
/// state of the lines it drives.
pub struct Motor<P: GpioPort> {
    bus: GpioBus<P>,
    pins: MotorPins,
    limits: LimitSwitches,
    duty: DutyCycles,
}

impl<P: GpioPort> Motor<P> {
    pub fn new(bus: GpioBus<P>, pins: MotorPins, limits: LimitSwitches, duty: DutyCycles) -> Self {
        Self {
            bus,
            pins,
            limits,
            duty,
        }
    }

    /// Run the motor forward (opening) until the open-limit switch
    /// asserts, `deadline` passes, or `cancel` fires.
    pub fn forward(&self, deadline: Instant, cancel: &CancelToken) -> Result<(), MotorError> {
        self.run(Direction::Forward, deadline, cancel)
    }

    /// Run the motor backward (closing).  Mirror of [`forward`](Self::forward).
    pub fn backward(&self, deadline: Instant, cancel: &CancelToken) -> Result<(), MotorError> {
        self.run(Direction::Backward, deadline, cancel)
    }

    /// Drop the duty cycle to zero.  Never fails under normal line access.
    pub fn stop(&self) -> Result<(), MotorError> {
        info!("stopping the motor");
        let mut port = self.bus.acquire()?;
        self.pins.halt(&mut *port)?;
        info!("motor is stopped");
        Ok(())
    }

    fn run(
        &self,
        direction: Direction,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<(), MotorError> {
        info!("turning motor {direction}");

        // Exclusive line access for the whole motion.
        let mut port = self.bus.acquire()?;

        let limit_pin = match direction {
            Direction::Forward => self.limits.open_pin,
            Direction::Backward => self.limits.close_pin,
        };
        port.set_mode(limit_pin, LineMode::Input)?;

        self.pins.engage(&mut *port, direction)?;

        let duty = match direction {
            Direction::Forward => self.duty.opening,
            Direction::Backward => self.duty.closing,
        };
        info!("starting the motor: duty cycle {duty}/{DUTY_DENOMINATOR}");
        self.pins.set_duty(&mut *port, direction, duty)?;

        // Cancellation is checked before the limit switch: a cancelled
        // call must report cancellation even if the door finished.
        loop {
            if cancel.is_cancelled() {
                info!("motor stopped: motion cancelled by caller");
                self.pins.set_duty(&mut *port, direction, 0)?;
                return Err(MotorError::Cancelled);
            }

            match port.read(limit_pin) {
                Ok(Level::Low) => {
                    info!("hit the {direction} limit switch");
                    self.pins.set_duty(&mut *port, direction, 0)?;
                    info!("motor is stopped");
                    return Ok(());
                }
                Ok(Level::High) => {}
                Err(e) => {
                    // Best-effort halt before surfacing the line failure.
                    let _ = self.pins.set_duty(&mut *port, direction, 0);
                    return Err(e.into());
                }
            }

            if Instant::now() >= deadline {
                warn!("motion deadline exceeded, shutting the motor down");
                self.pins.set_duty(&mut *port, direction, 0)?;
                return Err(MotorError::Timeout);
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}
