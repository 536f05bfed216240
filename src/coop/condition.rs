//! Door conditions: when should the coop open or close.
//!
//! Two variants behind one contract, selected by a string tag at
//! construction: `time_based` fires at a fixed wall-clock time,
//! `sun_based` fires at sunrise (opening) or sunset (closing) shifted
//! by a signed offset.  Construction validates the value against the
//! tag and fails closed; instances are immutable and replaced wholesale
//! on configuration update.

use chrono::{DateTime, Days, Duration as TimeDelta, NaiveTime, TimeZone};

use crate::coop::sun::{self, SunEvent};
use crate::error::ConditionError;

/// Mode tag for fixed clock-time conditions.
pub const MODE_TIME_BASED: &str = "time_based";
/// Mode tag for sun-relative conditions.
pub const MODE_SUN_BASED: &str = "sun_based";

/// Whether a condition gates the opening or the closing of the door.
/// Sun-based conditions anchor on sunrise for opening, sunset for closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Opening,
    Closing,
}

impl TriggerKind {
    fn sun_event(self) -> SunEvent {
        match self {
            Self::Opening => SunEvent::Sunrise,
            Self::Closing => SunEvent::Sunset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    TimeBased {
        time: NaiveTime,
        raw: String,
    },
    SunBased {
        /// Signed shift applied to the sun event time.
        offset: TimeDelta,
        raw: String,
    },
}

impl Condition {
    /// Construct a condition from its mode tag and encoded value.
    ///
    /// `time_based` takes `HH:MM`; `sun_based` takes a signed `±HH:MM`
    /// offset (the sign is optional for positive offsets).
    pub fn new(mode: &str, value: &str) -> Result<Self, ConditionError> {
        match mode {
            MODE_TIME_BASED => {
                let time = NaiveTime::parse_from_str(value, "%H:%M")
                    .map_err(|_| ConditionError::InvalidValue)?;
                Ok(Self::TimeBased {
                    time,
                    raw: value.to_owned(),
                })
            }
            MODE_SUN_BASED => {
                let offset = parse_offset(value).ok_or(ConditionError::InvalidValue)?;
                Ok(Self::SunBased {
                    offset,
                    raw: value.to_owned(),
                })
            }
            _ => Err(ConditionError::UnknownMode),
        }
    }

    /// The mode tag this condition was constructed with.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::TimeBased { .. } => MODE_TIME_BASED,
            Self::SunBased { .. } => MODE_SUN_BASED,
        }
    }

    /// The encoded value, round-trippable through [`Condition::new`].
    pub fn value(&self) -> &str {
        match self {
            Self::TimeBased { raw, .. } | Self::SunBased { raw, .. } => raw,
        }
    }

    /// The next future instant at which this condition triggers.
    pub fn next_trigger<Tz: TimeZone>(
        &self,
        kind: TriggerKind,
        latitude: f64,
        longitude: f64,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<Tz>, ConditionError> {
        // Today's occurrence may already have passed; roll forward day
        // by day (two days covers DST gaps on the candidate time).
        for ahead in 0..=2 {
            let date = now
                .date_naive()
                .checked_add_days(Days::new(ahead))
                .ok_or(ConditionError::InvalidValue)?;
            let candidate = match self {
                Self::TimeBased { time, .. } => now
                    .timezone()
                    .from_local_datetime(&date.and_time(*time))
                    .earliest(),
                Self::SunBased { offset, .. } => Some(
                    sun::sun_time(date, latitude, longitude, kind.sun_event(), &now.timezone())
                        .ok_or(ConditionError::NoSunEvent)?
                        + *offset,
                ),
            };
            if let Some(candidate) = candidate {
                if candidate > *now {
                    return Ok(candidate);
                }
            }
        }
        Err(ConditionError::InvalidValue)
    }

    /// Whether `now` is at or past today's occurrence of the trigger.
    pub fn is_met<Tz: TimeZone>(
        &self,
        kind: TriggerKind,
        latitude: f64,
        longitude: f64,
        now: &DateTime<Tz>,
    ) -> Result<bool, ConditionError> {
        let today = now.date_naive();
        let occurrence = match self {
            Self::TimeBased { time, .. } => now
                .timezone()
                .from_local_datetime(&today.and_time(*time))
                .earliest(),
            Self::SunBased { offset, .. } => Some(
                sun::sun_time(today, latitude, longitude, kind.sun_event(), &now.timezone())
                    .ok_or(ConditionError::NoSunEvent)?
                    + *offset,
            ),
        };
        Ok(occurrence.is_some_and(|occurrence| *now >= occurrence))
    }
}

/// Parse a signed `±HH:MM` offset.  Minutes must be below 60.
fn parse_offset(value: &str) -> Option<TimeDelta> {
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    let total = hours * 60 + minutes;
    Some(TimeDelta::minutes(if negative { -total } else { total }))
}
