//! DHT-family humidity/temperature sensor protocol decoder.
//!
//! One read is a single-wire handshake-and-capture cycle: the controller
//! holds the data line low to request a reading, releases it, then the
//! sensor clocks out 40 bits as (sync pulse, data pulse) pairs whose
//! relative durations encode each bit.  DHT11, DHT12 and DHT22 (alias
//! AM2302) share the bit encoding and differ only in handshake duration
//! and byte-to-value formulas.
//!
//! Capture is timing-sensitive and runs under the line-access guard;
//! classification and decoding are pure functions over the captured
//! pulse durations, kept separate so they can be tested with synthetic
//! pulse trains.

use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use heapless::Vec as FixedVec;
use log::{error, info, warn};

use crate::error::{Error, SensorError};
use crate::ports::{GpioBus, GpioPort, Level, LineId, LineMode};

/// Capture buffer size: one frame is 40 pulse pairs, with headroom for
/// leading pulses that precede the real frame.
const MAX_PULSES: usize = 50;

/// Pulse pairs in one complete 5-byte frame.
const FRAME_PULSES: usize = 40;

/// No transition for this long means the frame is over.
const END_OF_FRAME_SILENCE_US: i64 = 8_000;

/// Pull-up settle time before the handshake.
const SETTLE: Duration = Duration::from_micros(1_000);

/// Read attempts before the final error surfaces.
const DEFAULT_ATTEMPTS: u32 = 10;

/// Fixed backoff between attempts.
const DEFAULT_BACKOFF: Duration = Duration::from_millis(1_500);

// ───────────────────────────────────────────────────────────────
// Sensor variants
// ───────────────────────────────────────────────────────────────

/// Sensor family member, selecting handshake timing and value encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtKind {
    /// Integer-only humidity and temperature.
    Dht11,
    /// Tenth-degree resolution, sign bit in the temperature low byte.
    Dht12,
    /// 16-bit tenths encoding, sign bit in the temperature high byte.
    /// The AM2302 is the wired variant of the same part.
    Dht22,
}

impl DhtKind {
    /// How long the controller holds the line low to request a reading.
    fn handshake(self) -> Duration {
        match self {
            Self::Dht12 => Duration::from_millis(200),
            Self::Dht11 | Self::Dht22 => Duration::from_millis(18),
        }
    }
}

impl FromStr for DhtKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Error> {
        match tag {
            "DHT11" => Ok(Self::Dht11),
            "DHT12" => Ok(Self::Dht12),
            "DHT22" | "AM2302" => Ok(Self::Dht22),
            _ => Err(Error::Config("unsupported temperature sensor type")),
        }
    }
}

/// One decoded reading.  Ephemeral: produced per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature_f: f32,
    pub humidity: f32,
}

// ───────────────────────────────────────────────────────────────
// Pulse capture
// ───────────────────────────────────────────────────────────────

/// Raw (sync, data) pulse durations in microseconds, paired by index.
struct PulseTrain {
    sync: FixedVec<u16, MAX_PULSES>,
    data: FixedVec<u16, MAX_PULSES>,
}

/// Run the handshake and capture the sensor's pulse train.
///
/// Must be called with the line-access guard held: the timing loop
/// polls the line as fast as the port allows and timestamps every
/// transition.
fn capture<P: GpioPort>(
    port: &mut P,
    line: LineId,
    handshake: Duration,
) -> Result<PulseTrain, SensorError> {
    // Let the external pull-up settle, then signal "ready to read".
    port.set_mode(line, LineMode::Input)?;
    thread::sleep(SETTLE);
    port.set_mode(line, LineMode::Output)?;
    port.write(line, Level::Low)?;
    thread::sleep(handshake);

    // Release the line; the sensor drives it from here on.
    port.set_mode(line, LineMode::Input)?;

    let started = Instant::now();
    let mut level = Level::Low;
    let mut last_change: i64 = 0;
    let mut train = PulseTrain {
        sync: FixedVec::new(),
        data: FixedVec::new(),
    };

    loop {
        let now = started.elapsed().as_micros() as i64;
        if port.read(line)? != level {
            let span = (now - last_change).min(i64::from(u16::MAX)) as u16;
            if level == Level::Low {
                // Rising edge ends a sync pulse.
                level = Level::High;
                let _ = train.sync.push(span);
            } else {
                // Falling edge ends a data pulse, completing one bit.
                level = Level::Low;
                let _ = train.data.push(span);
                if train.data.is_full() {
                    break;
                }
            }
            last_change = now;
        } else if now - last_change >= END_OF_FRAME_SILENCE_US {
            // The line went quiet: end of frame.
            break;
        }
    }

    Ok(train)
}

// ───────────────────────────────────────────────────────────────
// Frame decoding (pure)
// ───────────────────────────────────────────────────────────────

/// Decode a captured pulse train into (temperature °C, humidity %).
///
/// `sync` and `data` are paired by index.  Only the last 40 pairs form
/// the frame; leading pairs are discarded.  A data pulse longer than
/// the mean sync duration over those 40 pairs encodes a 1 bit.
pub fn decode_frame(sync: &[u16], data: &[u16], kind: DhtKind) -> Result<(f32, f32), SensorError> {
    let count = data.len().min(sync.len());
    if count < FRAME_PULSES {
        return Err(SensorError::Timeout { pulses: count });
    }
    let offset = count - FRAME_PULSES;

    let sync_mean = sync[offset..offset + FRAME_PULSES]
        .iter()
        .map(|&d| f32::from(d))
        .sum::<f32>()
        / FRAME_PULSES as f32;

    // Pack 40 bits into 5 bytes, MSB first.
    let mut bytes = [0u8; 5];
    for (i, &pulse) in data[offset..offset + FRAME_PULSES].iter().enumerate() {
        if f32::from(pulse) > sync_mean {
            bytes[i / 8] |= 1 << (7 - i % 8);
        }
    }

    let sum = bytes[..4].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if bytes[4] != sum {
        return Err(SensorError::Checksum);
    }

    let (temperature, humidity) = match kind {
        DhtKind::Dht11 => (f32::from(bytes[2]), f32::from(bytes[0])),
        DhtKind::Dht12 => {
            let humidity = f32::from(bytes[0]) + f32::from(bytes[1]) / 10.0;
            // The fraction byte goes in unmasked; the high bit doubles
            // as the sign flag.
            let mut temperature = f32::from(bytes[2]) + f32::from(bytes[3]) / 10.0;
            if bytes[3] & 0x80 != 0 {
                temperature = -temperature;
            }
            (temperature, humidity)
        }
        DhtKind::Dht22 => {
            let humidity = (f32::from(bytes[0]) * 256.0 + f32::from(bytes[1])) / 10.0;
            let mut temperature =
                (f32::from(bytes[2] & 0x7F) * 256.0 + f32::from(bytes[3])) / 10.0;
            if bytes[2] & 0x80 != 0 {
                temperature = -temperature;
            }
            (temperature, humidity)
        }
    };

    // A humidity of exactly zero means a dead or disconnected sensor.
    if humidity > 100.0 || humidity == 0.0 {
        return Err(SensorError::OutOfRange);
    }

    Ok((temperature, humidity))
}

// ───────────────────────────────────────────────────────────────
// Sensor
// ───────────────────────────────────────────────────────────────

/// One physical DHT-family sensor on a numbered line.
pub struct DhtSensor<P: GpioPort> {
    bus: GpioBus<P>,
    name: String,
    kind: DhtKind,
    line: LineId,
    attempts: u32,
    backoff: Duration,
}

impl<P: GpioPort> DhtSensor<P> {
    pub fn new(bus: GpioBus<P>, name: impl Into<String>, kind: DhtKind, line: LineId) -> Self {
        Self {
            bus,
            name: name.into(),
            kind,
            line,
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override the retry policy.  Production keeps the default
    /// (10 attempts, 1.5 s backoff); tests shorten it.
    pub fn with_retry_policy(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DhtKind {
        self.kind
    }

    /// Read one humidity/temperature sample, retrying decode failures.
    ///
    /// The line-access guard is held per attempt and released during
    /// the backoff sleep, so motor motions are not starved by a flaky
    /// sensor.  Line failures are fatal immediately; decode failures
    /// (timeout, checksum, out-of-range) retry up to the attempt limit.
    pub fn read(&self) -> Result<SensorReading, SensorError> {
        let mut remaining = self.attempts;
        loop {
            let attempt = self.read_once();
            match attempt {
                Ok((celsius, humidity)) => {
                    let temperature_f = celsius * 9.0 / 5.0 + 32.0;
                    info!(
                        "{}: {:?} reads {temperature_f:.1}F, humidity {humidity:.1}%",
                        self.name, self.kind
                    );
                    return Ok(SensorReading {
                        temperature_f,
                        humidity,
                    });
                }
                Err(e @ SensorError::Line(_)) => return Err(e),
                Err(e) => {
                    remaining -= 1;
                    if remaining == 0 {
                        error!("{}: sensor read failed: {e}", self.name);
                        return Err(e);
                    }
                    warn!("{}: sensor read failed, retrying: {e}", self.name);
                    thread::sleep(self.backoff);
                }
            }
        }
    }

    /// One handshake-capture-decode cycle under the line guard.
    fn read_once(&self) -> Result<(f32, f32), SensorError> {
        let mut port = self.bus.acquire()?;
        let train = capture(&mut *port, self.line, self.kind.handshake())?;
        decode_frame(&train.sync, &train.data, self.kind)
    }
}
