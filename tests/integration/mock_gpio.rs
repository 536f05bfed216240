//! In-memory GPIO adapter and notification sink for the integration
//! tests.  Records every call so tests can assert on the electrical
//! sequence a scenario produced, and lets scenarios script line levels
//! and injected read failures.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use coopd::coop::CoopEvent;
use coopd::error::LineError;
use coopd::ports::{GpioPort, Level, LineId, LineMode, NotificationSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetMode(LineId, LineMode),
    Write(LineId, Level),
    PwmFrequency(LineId, u32),
    DutyCycle(LineId, u32, u32),
}

#[derive(Default)]
struct Inner {
    levels: HashMap<LineId, Level>,
    duty: HashMap<LineId, (u32, u32)>,
    calls: Vec<Call>,
    failing_reads: HashSet<LineId>,
}

/// Clonable handle to one simulated line subsystem.  Clones share
/// state, so a test keeps one handle for assertions while another is
/// consumed by the crate under test.
#[derive(Clone, Default)]
pub struct MockGpio {
    inner: Arc<Mutex<Inner>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the level an input line will read.  Unscripted lines read
    /// `High` (limit switches are active low, so `High` means "not at
    /// the end of travel").
    pub fn set_level(&self, line: LineId, level: Level) {
        self.inner.lock().unwrap().levels.insert(line, level);
    }

    /// Make every read of `line` fail with [`LineError::ReadFailed`].
    pub fn fail_reads(&self, line: LineId) {
        self.inner.lock().unwrap().failing_reads.insert(line);
    }

    /// Last duty cycle applied to `line`, as `(numerator, denominator)`.
    pub fn duty(&self, line: LineId) -> Option<(u32, u32)> {
        self.inner.lock().unwrap().duty.get(&line).copied()
    }

    /// Level last written to `line`, if any.
    pub fn written_level(&self, line: LineId) -> Option<Level> {
        self.inner.lock().unwrap().levels.get(&line).copied()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Every duty numerator applied to `line`, in call order.
    pub fn duty_history(&self, line: LineId) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DutyCycle(l, num, _) if l == line => Some(num),
                _ => None,
            })
            .collect()
    }
}

impl GpioPort for MockGpio {
    fn set_mode(&mut self, line: LineId, mode: LineMode) -> Result<(), LineError> {
        self.inner.lock().unwrap().calls.push(Call::SetMode(line, mode));
        Ok(())
    }

    fn write(&mut self, line: LineId, level: Level) -> Result<(), LineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Write(line, level));
        inner.levels.insert(line, level);
        Ok(())
    }

    fn read(&mut self, line: LineId) -> Result<Level, LineError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_reads.contains(&line) {
            return Err(LineError::ReadFailed);
        }
        Ok(inner.levels.get(&line).copied().unwrap_or(Level::High))
    }

    fn set_pwm_frequency(&mut self, line: LineId, hz: u32) -> Result<(), LineError> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(Call::PwmFrequency(line, hz));
        Ok(())
    }

    fn set_duty_cycle(
        &mut self,
        line: LineId,
        numerator: u32,
        denominator: u32,
    ) -> Result<(), LineError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .calls
            .push(Call::DutyCycle(line, numerator, denominator));
        inner.duty.insert(line, (numerator, denominator));
        Ok(())
    }
}

/// Notification sink that records every event it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<CoopEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CoopEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &CoopEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
