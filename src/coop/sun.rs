//! Sunrise/sunset computation.
//!
//! Implements the standard sunrise equation (NOAA formulation): mean
//! solar time, solar mean anomaly, equation of centre, ecliptic
//! longitude, then the hour angle for a -0.833° sun altitude (refraction
//! plus solar disc radius).  Accuracy is within a couple of minutes,
//! which is plenty for deciding when to move a door.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Which sun event to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

/// Days from the J2000 epoch to the Unix epoch.
const JULIAN_UNIX_EPOCH: f64 = 2_440_587.5;
const J2000: f64 = 2_451_545.0;

/// Earth's axial tilt, degrees.
const OBLIQUITY: f64 = 23.4397;

/// Sun altitude at the moment of rise/set, degrees.
const RISE_SET_ALTITUDE: f64 = -0.833;

fn sin_d(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_d(deg: f64) -> f64 {
    deg.to_radians().cos()
}

/// Compute the time of `event` on `date` at the given site, in the
/// caller's timezone.  Returns `None` during polar day or polar night,
/// when the sun never crosses the rise/set altitude.
pub fn sun_time<Tz: TimeZone>(
    date: NaiveDate,
    latitude: f64,
    longitude: f64,
    event: SunEvent,
    tz: &Tz,
) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64;
    let julian_day = midnight / 86_400.0 + JULIAN_UNIX_EPOCH;

    // Mean solar time at the site (longitude positive east).
    let days = (julian_day - J2000 + 0.000_8).round();
    let mean_solar = days - longitude / 360.0;

    // Solar mean anomaly and equation of centre.
    let anomaly = (357.529_1 + 0.985_600_28 * mean_solar).rem_euclid(360.0);
    let centre =
        1.914_8 * sin_d(anomaly) + 0.02 * sin_d(2.0 * anomaly) + 0.000_3 * sin_d(3.0 * anomaly);

    // Ecliptic longitude and solar transit.
    let ecliptic = (anomaly + centre + 180.0 + 102.937_2).rem_euclid(360.0);
    let transit = J2000 + mean_solar + 0.005_3 * sin_d(anomaly) - 0.006_9 * sin_d(2.0 * ecliptic);

    // Declination of the sun and the hour angle at rise/set altitude.
    let declination = (sin_d(ecliptic) * sin_d(OBLIQUITY)).asin().to_degrees();
    let cos_hour = (sin_d(RISE_SET_ALTITUDE) - sin_d(latitude) * sin_d(declination))
        / (cos_d(latitude) * cos_d(declination));
    if !(-1.0..=1.0).contains(&cos_hour) {
        // Polar day (< -1) or polar night (> 1).
        return None;
    }
    let hour_angle = cos_hour.acos().to_degrees();

    let julian_event = match event {
        SunEvent::Sunrise => transit - hour_angle / 360.0,
        SunEvent::Sunset => transit + hour_angle / 360.0,
    };

    let unix = (julian_event - JULIAN_UNIX_EPOCH) * 86_400.0;
    let utc = DateTime::<Utc>::from_timestamp(unix.round() as i64, 0)?;
    Some(utc.with_timezone(tz))
}
