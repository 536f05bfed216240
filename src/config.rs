//! Configuration values consumed by the core.
//!
//! Loading (file format, CLI flags) lives outside the crate; these
//! structs are the read-only inputs the core is built from.  The schema
//! mirrors the deployment layout: door (motor, limit switches,
//! durations), coop (location, conditions, mode), fan, and the two
//! temperature sensors.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ports::LineId;

/// Top-level configuration for one coop installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub door: DoorConfig,
    pub coop: CoopConfig,
    pub fan: FanConfig,
    pub temperature: TemperatureConfig,
}

/// Door hardware: motor wiring, limit switches, and motion durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorConfig {
    pub motor: MotorConfig,
    pub stop_limit: StopLimitConfig,
    /// PWM duty (out of 100) while opening.  Distinct from closing
    /// because the physical load differs by direction.
    pub pwm_open_duty_cycle: u32,
    /// PWM duty (out of 100) while closing.
    pub pwm_close_duty_cycle: u32,
    /// Software safety bound for a full opening run, in seconds.
    pub opening_duration_secs: u64,
    /// Software safety bound for a full closing run, in seconds.
    pub closing_duration_secs: u64,
}

/// H-bridge wiring, tagged by board type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MotorConfig {
    L298n {
        pin_1a: LineId,
        pin_1b: LineId,
        pin_enable1: LineId,
    },
    L293d {
        pin_1a: LineId,
        pin_1b: LineId,
        pin_enable1: LineId,
    },
    Bts7960 {
        forward_pwm: LineId,
        backward_pwm: LineId,
        forward_enable: LineId,
        backward_enable: LineId,
    },
}

/// End-of-travel limit switch inputs (active low).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopLimitConfig {
    /// Asserted when the door reaches fully open.
    pub open_pin: LineId,
    /// Asserted when the door reaches fully closed.
    pub close_pin: LineId,
}

/// Site location, automatic mode, and the two conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoopConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub is_automatic: bool,
    pub opening: ConditionConfig,
    pub closing: ConditionConfig,
}

/// One condition as a mode tag plus its encoded value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// `time_based` or `sun_based`.
    pub mode: String,
    /// `HH:MM` clock time, or a signed `±HH:MM` offset from the sun event.
    pub value: String,
}

/// Cooling fan line and trigger threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanConfig {
    pub pin: LineId,
    /// Inside temperature (Fahrenheit) above which the fan runs.
    pub temp_limit: f32,
}

/// The two humidity/temperature sensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub inside: SensorConfig,
    pub outside: SensorConfig,
}

/// One DHT-family sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    /// `DHT11`, `DHT12`, `DHT22`, or `AM2302`.
    #[serde(rename = "type")]
    pub kind: String,
    pub pin: LineId,
}

impl Config {
    /// Range-check every field.  Invalid values are rejected with a
    /// typed error naming the field, never silently clamped.
    pub fn validate(&self) -> Result<(), Error> {
        if self.door.pwm_open_duty_cycle == 0 || self.door.pwm_open_duty_cycle > 100 {
            return Err(Error::Config("door.pwm_open_duty_cycle must be 1..=100"));
        }
        if self.door.pwm_close_duty_cycle == 0 || self.door.pwm_close_duty_cycle > 100 {
            return Err(Error::Config("door.pwm_close_duty_cycle must be 1..=100"));
        }
        if self.door.opening_duration_secs == 0 {
            return Err(Error::Config("door.opening_duration_secs must be non-zero"));
        }
        if self.door.closing_duration_secs == 0 {
            return Err(Error::Config("door.closing_duration_secs must be non-zero"));
        }
        if !(-90.0..=90.0).contains(&self.coop.latitude) {
            return Err(Error::Config("coop.latitude must be within -90..=90"));
        }
        if !(-180.0..=180.0).contains(&self.coop.longitude) {
            return Err(Error::Config("coop.longitude must be within -180..=180"));
        }
        if !self.fan.temp_limit.is_finite() {
            return Err(Error::Config("fan.temp_limit must be finite"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            door: DoorConfig {
                motor: MotorConfig::L298n {
                    pin_1a: 20,
                    pin_1b: 21,
                    pin_enable1: 12,
                },
                stop_limit: StopLimitConfig {
                    open_pin: 5,
                    close_pin: 6,
                },
                pwm_open_duty_cycle: 90,
                pwm_close_duty_cycle: 70,
                opening_duration_secs: 50,
                closing_duration_secs: 50,
            },
            coop: CoopConfig {
                latitude: 48.866,
                longitude: 2.333,
                is_automatic: true,
                opening: ConditionConfig {
                    mode: "sun_based".into(),
                    value: "-00:30".into(),
                },
                closing: ConditionConfig {
                    mode: "sun_based".into(),
                    value: "+00:30".into(),
                },
            },
            fan: FanConfig {
                pin: 16,
                temp_limit: 90.0,
            },
            temperature: TemperatureConfig {
                inside: SensorConfig {
                    name: "inside".into(),
                    kind: "DHT22".into(),
                    pin: 4,
                },
                outside: SensorConfig {
                    name: "outside".into(),
                    kind: "DHT22".into(),
                    pin: 17,
                },
            },
        }
    }
}
