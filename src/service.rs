//! Coop service: the contract exposed to the (external) web layer.
//!
//! ```text
//!  HTTP handlers ──▶ CoopService ──▶ Coop / DhtSensor / FanDriver
//! ```
//!
//! A thin facade over the aggregate plus the two sensors and the fan.
//! Door motions block the calling task for up to the configured
//! duration, and a sensor read can take ~15 s worst case across its
//! retries; callers on a request path must treat these as slow,
//! blocking operations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::config::Config;
use crate::coop::door::Door;
use crate::coop::{Coop, CoopSnapshot, CoopUpdateRequest};
use crate::drivers::fan::FanDriver;
use crate::drivers::motor::{DutyCycles, LimitSwitches, Motor, MotorPins};
use crate::error::{ConditionError, Result};
use crate::ports::{GpioBus, GpioPort, NotificationSink};
use crate::sensors::dht::DhtSensor;

/// One combined inside/outside reading.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TemperatureReport {
    pub inside_temperature_f: f32,
    pub inside_humidity: f32,
    pub outside_temperature_f: f32,
    pub outside_humidity: f32,
}

pub struct CoopService<P: GpioPort> {
    coop: Arc<Coop<P>>,
    inside: DhtSensor<P>,
    outside: DhtSensor<P>,
    fan: FanDriver<P>,
    fan_temp_limit: f32,
}

impl<P: GpioPort> CoopService<P> {
    pub fn new(
        coop: Arc<Coop<P>>,
        inside: DhtSensor<P>,
        outside: DhtSensor<P>,
        fan: FanDriver<P>,
        fan_temp_limit: f32,
    ) -> Self {
        Self {
            coop,
            inside,
            outside,
            fan,
            fan_temp_limit,
        }
    }

    /// Wire up the whole core from configuration over one GPIO adapter.
    pub fn from_config(
        config: &Config,
        port: P,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config.validate()?;
        let bus = GpioBus::new(port);

        let motor = Motor::new(
            bus.clone(),
            MotorPins::from(&config.door.motor),
            LimitSwitches {
                open_pin: config.door.stop_limit.open_pin,
                close_pin: config.door.stop_limit.close_pin,
            },
            DutyCycles {
                opening: config.door.pwm_open_duty_cycle,
                closing: config.door.pwm_close_duty_cycle,
            },
        );
        let door = Door::new(
            motor,
            Duration::from_secs(config.door.opening_duration_secs),
            Duration::from_secs(config.door.closing_duration_secs),
        );
        let coop = Arc::new(Coop::new(door, &config.coop, notifier)?);

        let inside = DhtSensor::new(
            bus.clone(),
            config.temperature.inside.name.clone(),
            config.temperature.inside.kind.parse()?,
            config.temperature.inside.pin,
        );
        let outside = DhtSensor::new(
            bus.clone(),
            config.temperature.outside.name.clone(),
            config.temperature.outside.kind.parse()?,
            config.temperature.outside.pin,
        );
        let fan = FanDriver::new(bus, config.fan.pin)?;

        Ok(Self::new(coop, inside, outside, fan, config.fan.temp_limit))
    }

    // ── Coop operations ───────────────────────────────────────

    pub fn coop(&self) -> CoopSnapshot {
        self.coop.snapshot()
    }

    pub fn update(&self, request: &CoopUpdateRequest) -> Result<()> {
        self.coop.update(request)
    }

    pub fn open(&self) -> Result<()> {
        self.coop.open()
    }

    pub fn close(&self) -> Result<()> {
        self.coop.close()
    }

    pub fn stop(&self) -> Result<()> {
        self.coop.stop()
    }

    /// One automatic-mode evaluation tick.  The periodic timer lives
    /// with the caller.
    pub fn evaluate<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<()> {
        self.coop.evaluate(now)
    }

    pub fn next_opening_time<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> core::result::Result<DateTime<Tz>, ConditionError> {
        self.coop.next_opening_time(now)
    }

    pub fn next_closing_time<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> core::result::Result<DateTime<Tz>, ConditionError> {
        self.coop.next_closing_time(now)
    }

    // ── Temperature and fan ───────────────────────────────────

    /// Read both sensors.  The fan is driven from the inside reading
    /// between the two reads, synchronously, under the same line-access
    /// domain as every other hardware sequence.
    pub fn temperatures(&self) -> Result<TemperatureReport> {
        let inside = self.inside.read()?;
        self.drive_fan(inside.temperature_f)?;

        let outside = self.outside.read()?;
        Ok(TemperatureReport {
            inside_temperature_f: inside.temperature_f,
            inside_humidity: inside.humidity,
            outside_temperature_f: outside.temperature_f,
            outside_humidity: outside.humidity,
        })
    }

    /// Threshold switch for the cooling fan: on above the limit, off at
    /// or below it.  No hysteresis band.
    pub fn drive_fan(&self, inside_temperature_f: f32) -> Result<()> {
        if inside_temperature_f > self.fan_temp_limit {
            self.fan.on()?;
        } else {
            self.fan.off()?;
        }
        Ok(())
    }
}
