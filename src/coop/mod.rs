//! The coop aggregate: door status state machine, conditions, and the
//! automatic open/close decision logic.
//!
//! Status transitions: `Closed → Opening → Opened` via [`Coop::open`],
//! `Opened → Closing → Closed` via [`Coop::close`].  `Unknown` is the
//! starting state and stays reachable from any state on irrecoverable
//! failure.  A configuration update rewrites conditions, mode, and
//! location without itself moving the door.
//!
//! Open/close requests from concurrent callers (web handlers, the
//! periodic evaluation tick) are serialised by a motion guard so the
//! status check and the door call act as one step.

pub mod condition;
pub mod door;
pub mod sun;

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeZone};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ConditionConfig, CoopConfig};
use crate::coop::condition::{Condition, TriggerKind};
use crate::coop::door::Door;
use crate::error::{ConditionError, CoopError, Error, Result};
use crate::ports::{CancelToken, GpioPort, NotificationSink};

// ───────────────────────────────────────────────────────────────
// Status and events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoopStatus {
    Unknown,
    Opened,
    Opening,
    Closed,
    Closing,
}

impl core::fmt::Display for CoopStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Opened => write!(f, "opened"),
            Self::Opening => write!(f, "opening"),
            Self::Closed => write!(f, "closed"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Events emitted through the [`NotificationSink`] port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoopEvent {
    /// The coop came up, carrying its initial status.
    Started { status: CoopStatus },
    /// The door finished opening.
    Opened,
    /// The door finished closing.
    Closed,
}

/// Read-only view of the coop for the web layer.
#[derive(Debug, Clone, Serialize)]
pub struct CoopSnapshot {
    pub status: CoopStatus,
    pub is_automatic: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub opening_condition: ConditionConfig,
    pub closing_condition: ConditionConfig,
}

/// Full configuration rewrite, applied atomically by [`Coop::update`].
#[derive(Debug, Clone, Deserialize)]
pub struct CoopUpdateRequest {
    pub status: CoopStatus,
    pub is_automatic: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub opening_condition: ConditionConfig,
    pub closing_condition: ConditionConfig,
}

// ───────────────────────────────────────────────────────────────
// Coop
// ───────────────────────────────────────────────────────────────

struct State {
    status: CoopStatus,
    is_automatic: bool,
    latitude: f64,
    longitude: f64,
    opening: Condition,
    closing: Condition,
}

/// The aggregate root.  Owns the door exclusively; lives for the whole
/// process.
pub struct Coop<P: GpioPort> {
    state: RwLock<State>,
    door: Door<P>,
    /// Serialises the status check-then-act of open/close.
    motion: Mutex<()>,
    cancel: CancelToken,
    notifier: Arc<dyn NotificationSink>,
}

impl<P: GpioPort> Coop<P> {
    /// Build the coop from configuration, starting in status `Unknown`.
    /// Fails if either condition cannot be constructed.
    pub fn new(
        door: Door<P>,
        config: &CoopConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let opening = Condition::new(&config.opening.mode, &config.opening.value)?;
        let closing = Condition::new(&config.closing.mode, &config.closing.value)?;

        let coop = Self {
            state: RwLock::new(State {
                status: CoopStatus::Unknown,
                is_automatic: config.is_automatic,
                latitude: config.latitude,
                longitude: config.longitude,
                opening,
                closing,
            }),
            door,
            motion: Mutex::new(()),
            cancel: CancelToken::new(),
            notifier,
        };

        info!("coop created (automatic={})", config.is_automatic);
        coop.notifier.notify(&CoopEvent::Started {
            status: CoopStatus::Unknown,
        });
        Ok(coop)
    }

    // ── Door motion ───────────────────────────────────────────

    /// Open the door.  Rejected if the coop is already opened or mid-
    /// opening.  On motor failure the status is left at `Opening` for
    /// the operator to reconcile: a partially open door is a distinct
    /// physical state that must be inspected, not papered over.
    pub fn open(&self) -> Result<()> {
        let _motion = self.motion.lock().unwrap_or_else(PoisonError::into_inner);

        {
            let mut state = self.write_state();
            match state.status {
                CoopStatus::Opened => return Err(CoopError::AlreadyOpened.into()),
                CoopStatus::Opening => return Err(CoopError::AlreadyOpening.into()),
                _ => {}
            }
            state.status = CoopStatus::Opening;
        }

        info!("opening the coop");
        self.cancel.reset();
        match self.door.open(&self.cancel) {
            Ok(()) => {
                self.write_state().status = CoopStatus::Opened;
                info!("the coop is opened");
                self.notifier.notify(&CoopEvent::Opened);
                Ok(())
            }
            Err(e) => {
                warn!("opening the coop failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Close the door.  Structural mirror of [`Coop::open`].
    pub fn close(&self) -> Result<()> {
        let _motion = self.motion.lock().unwrap_or_else(PoisonError::into_inner);

        {
            let mut state = self.write_state();
            match state.status {
                CoopStatus::Closed => return Err(CoopError::AlreadyClosed.into()),
                CoopStatus::Closing => return Err(CoopError::AlreadyClosing.into()),
                _ => {}
            }
            state.status = CoopStatus::Closing;
        }

        info!("closing the coop");
        self.cancel.reset();
        match self.door.close(&self.cancel) {
            Ok(()) => {
                self.write_state().status = CoopStatus::Closed;
                info!("the coop is closed");
                self.notifier.notify(&CoopEvent::Closed);
                Ok(())
            }
            Err(e) => {
                warn!("closing the coop failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Abort any motion in flight and cut motor power.
    pub fn stop(&self) -> Result<()> {
        info!("stopping the coop door");
        self.cancel.cancel();
        self.door.stop().map_err(Into::into)
    }

    // ── Configuration ─────────────────────────────────────────

    /// Replace status, mode, location, and both conditions.
    ///
    /// Both conditions are constructed before anything is touched, so a
    /// bad request leaves the previous configuration fully in place.
    pub fn update(&self, request: &CoopUpdateRequest) -> Result<()> {
        let opening = Condition::new(
            &request.opening_condition.mode,
            &request.opening_condition.value,
        )?;
        let closing = Condition::new(
            &request.closing_condition.mode,
            &request.closing_condition.value,
        )?;

        let mut state = self.write_state();
        state.status = request.status;
        state.is_automatic = request.is_automatic;
        state.latitude = request.latitude;
        state.longitude = request.longitude;
        state.opening = opening;
        state.closing = closing;
        info!("coop configuration updated");
        Ok(())
    }

    pub fn snapshot(&self) -> CoopSnapshot {
        let state = self.read_state();
        CoopSnapshot {
            status: state.status,
            is_automatic: state.is_automatic,
            latitude: state.latitude,
            longitude: state.longitude,
            opening_condition: ConditionConfig {
                mode: state.opening.mode().to_owned(),
                value: state.opening.value().to_owned(),
            },
            closing_condition: ConditionConfig {
                mode: state.closing.mode().to_owned(),
                value: state.closing.value().to_owned(),
            },
        }
    }

    // ── Condition queries ─────────────────────────────────────

    pub fn next_opening_time<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> core::result::Result<DateTime<Tz>, ConditionError> {
        let state = self.read_state();
        state
            .opening
            .next_trigger(TriggerKind::Opening, state.latitude, state.longitude, now)
    }

    pub fn next_closing_time<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> core::result::Result<DateTime<Tz>, ConditionError> {
        let state = self.read_state();
        state
            .closing
            .next_trigger(TriggerKind::Closing, state.latitude, state.longitude, now)
    }

    // ── Automatic evaluation ──────────────────────────────────

    /// One evaluation tick of the automatic mode, driven by an external
    /// timer.
    ///
    /// The door should be open between the opening trigger and the
    /// closing trigger.  Motion is only initiated from the matching
    /// steady state (`Closed` to open, `Opened` to close); an `Unknown`
    /// status is never acted on automatically, the operator has to
    /// resolve it first.  State-conflict rejections from a racing
    /// manual request are benign and swallowed; real failures surface
    /// to the tick owner without poisoning later evaluations.
    pub fn evaluate<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<()> {
        let (status, should_be_open) = {
            let state = self.read_state();
            if !state.is_automatic {
                debug!("coop is in manual mode, skipping evaluation");
                return Ok(());
            }
            let opening_met =
                state
                    .opening
                    .is_met(TriggerKind::Opening, state.latitude, state.longitude, now)?;
            let closing_met =
                state
                    .closing
                    .is_met(TriggerKind::Closing, state.latitude, state.longitude, now)?;
            (state.status, opening_met && !closing_met)
        };

        let outcome = match (should_be_open, status) {
            (true, CoopStatus::Closed) => {
                info!("automatic evaluation: the coop should be opened");
                self.open()
            }
            (false, CoopStatus::Opened) => {
                info!("automatic evaluation: the coop should be closed");
                self.close()
            }
            _ => return Ok(()),
        };

        match outcome {
            Err(Error::Coop(conflict)) => {
                debug!("automatic motion superseded: {conflict}");
                Ok(())
            }
            other => other,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
