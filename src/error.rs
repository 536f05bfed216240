//! Unified error types for the coop controller core.
//!
//! One small enum per subsystem, all funnelled into a top-level [`Error`]
//! so the service layer's error handling stays uniform.  Variants are
//! `Copy` so they can be passed through the control paths without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The digital-line subsystem could not be reached or driven.
    Line(LineError),
    /// A motor motion failed or was interrupted.
    Motor(MotorError),
    /// A sensor read could not produce a trustworthy value.
    Sensor(SensorError),
    /// A condition could not be constructed or evaluated.
    Condition(ConditionError),
    /// An open/close request conflicted with the coop's current status.
    Coop(CoopError),
    /// Configuration is invalid; the message names the offending field.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(e) => write!(f, "line access: {e}"),
            Self::Motor(e) => write!(f, "motor: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Condition(e) => write!(f, "condition: {e}"),
            Self::Coop(e) => write!(f, "coop: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Digital-line errors
// ---------------------------------------------------------------------------

/// Failures reported by the digital-line capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// The line subsystem could not be acquired (device gone, lock poisoned).
    Unavailable,
    /// Switching a line between input and output mode failed.
    ModeSetFailed,
    /// Reading a line level failed.
    ReadFailed,
    /// Writing a line level failed.
    WriteFailed,
    /// Configuring PWM frequency or duty cycle failed.
    PwmFailed,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "line subsystem unavailable"),
            Self::ModeSetFailed => write!(f, "mode set failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::PwmFailed => write!(f, "PWM configuration failed"),
        }
    }
}

impl From<LineError> for Error {
    fn from(e: LineError) -> Self {
        Self::Line(e)
    }
}

// ---------------------------------------------------------------------------
// Motor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// The digital-line subsystem failed mid-motion.  Fatal for the call.
    LineAccess(LineError),
    /// The safety deadline elapsed before a limit switch asserted.
    /// Indicates a mechanical fault or a misconfigured duration; never
    /// retried automatically.
    Timeout,
    /// The caller cancelled the motion.  Distinguished from success so the
    /// cancellation reason stays visible even if the door physically
    /// finished its travel.
    Cancelled,
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineAccess(e) => write!(f, "line access failed: {e}"),
            Self::Timeout => write!(f, "motion deadline exceeded"),
            Self::Cancelled => write!(f, "motion cancelled"),
        }
    }
}

impl From<LineError> for MotorError {
    fn from(e: LineError) -> Self {
        Self::LineAccess(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Self::Motor(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The digital-line subsystem failed.  Not retried locally.
    Line(LineError),
    /// The sensor produced fewer data pulses than one 40-bit frame needs.
    Timeout {
        /// Number of data pulses actually captured.
        pulses: usize,
    },
    /// The frame checksum did not match; the reading is discarded whole.
    Checksum,
    /// The decoded humidity was zero or above 100 %, which indicates a
    /// dead, disconnected, or glitching sensor.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(e) => write!(f, "line access failed: {e}"),
            Self::Timeout { pulses } => write!(f, "timeout: {pulses} pulses received"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<LineError> for SensorError {
    fn from(e: LineError) -> Self {
        Self::Line(e)
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Condition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionError {
    /// The mode tag is neither `time_based` nor `sun_based`.
    UnknownMode,
    /// The value string could not be parsed for the given mode.
    InvalidValue,
    /// No sunrise/sunset occurs at this latitude on this date
    /// (polar day or polar night).
    NoSunEvent,
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMode => write!(f, "unknown condition mode"),
            Self::InvalidValue => write!(f, "invalid condition value"),
            Self::NoSunEvent => write!(f, "no sun event at this latitude/date"),
        }
    }
}

impl From<ConditionError> for Error {
    fn from(e: ConditionError) -> Self {
        Self::Condition(e)
    }
}

// ---------------------------------------------------------------------------
// Coop state conflicts
// ---------------------------------------------------------------------------

/// Open/Close requests rejected because of the coop's current status.
/// These are conflicts, not hardware failures: no side effect occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoopError {
    /// The coop is already opened.
    AlreadyOpened,
    /// The coop is opening.
    AlreadyOpening,
    /// The coop is already closed.
    AlreadyClosed,
    /// The coop is closing.
    AlreadyClosing,
}

impl fmt::Display for CoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyOpened => write!(f, "the coop is already opened"),
            Self::AlreadyOpening => write!(f, "the coop is opening"),
            Self::AlreadyClosed => write!(f, "the coop is already closed"),
            Self::AlreadyClosing => write!(f, "the coop is closing"),
        }
    }
}

impl From<CoopError> for Error {
    fn from(e: CoopError) -> Self {
        Self::Coop(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
