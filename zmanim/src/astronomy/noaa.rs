//! NOAA solar position algorithm
//!
//! Standard published equations (Meeus, as used by the NOAA solar
//! calculator). Accurate to about a minute away from the polar circles.

use super::{AstronomicalProvider, Location, ProviderError, ProviderResult};
use crate::semantic::SolarSide;
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Zenith of the upper limb at visible sunrise: 90° plus refraction and semi-diameter
const VISIBLE_ZENITH: f64 = 90.833;
const GEOMETRIC_ZENITH: f64 = 90.0;
const EARTH_RADIUS_METRES: f64 = 6_356_900.0;
const JULIAN_DAY_OF_CE_EPOCH: f64 = 1_721_424.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Rising,
    Setting,
}

/// Solar ephemeris for one instant, in degrees and minutes
struct SolarPosition {
    declination: f64,
    equation_of_time: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoaaProvider;

impl NoaaProvider {
    pub fn new() -> Self {
        Self
    }

    fn event(
        &self,
        date: NaiveDate,
        location: &Location,
        zenith: f64,
        event: Event,
        name: &str,
    ) -> ProviderResult {
        location.validate()?;
        let julian_day = julian_day(date);

        // Two refinement passes: evaluate the ephemeris at the previous estimate.
        let mut minutes = 720.0 - 4.0 * location.longitude;
        for _ in 0..2 {
            let position = solar_position(julian_day + minutes / 1440.0);
            let hour_angle = hour_angle(location.latitude, position.declination, zenith)
                .ok_or_else(|| ProviderError::NotVisible {
                    event: name.to_string(),
                    date,
                })?;
            let signed = match event {
                Event::Rising => hour_angle,
                Event::Setting => -hour_angle,
            };
            minutes = 720.0 - 4.0 * (location.longitude + signed) - position.equation_of_time;
        }

        to_local(date, minutes, location)
    }

    fn visible_zenith(location: &Location) -> f64 {
        let elevation = location.elevation.max(0.0);
        let dip = (EARTH_RADIUS_METRES / (EARTH_RADIUS_METRES + elevation))
            .acos()
            .to_degrees();
        VISIBLE_ZENITH + dip
    }
}

impl AstronomicalProvider for NoaaProvider {
    fn sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        let zenith = Self::visible_zenith(location);
        self.event(date, location, zenith, Event::Rising, "sunrise")
    }

    fn sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        let zenith = Self::visible_zenith(location);
        self.event(date, location, zenith, Event::Setting, "sunset")
    }

    fn solar_noon(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        location.validate()?;
        let julian_day = julian_day(date);
        let mut minutes = 720.0 - 4.0 * location.longitude;
        for _ in 0..2 {
            let position = solar_position(julian_day + minutes / 1440.0);
            minutes = 720.0 - 4.0 * location.longitude - position.equation_of_time;
        }
        to_local(date, minutes, location)
    }

    fn solar_angle_crossing(
        &self,
        date: NaiveDate,
        location: &Location,
        degrees: f64,
        side: SolarSide,
    ) -> ProviderResult {
        let zenith = GEOMETRIC_ZENITH + degrees;
        match side {
            SolarSide::Morning => self.event(
                date,
                location,
                zenith,
                Event::Rising,
                &format!("sun at {}° before sunrise", degrees),
            ),
            SolarSide::Evening => self.event(
                date,
                location,
                zenith,
                Event::Setting,
                &format!("sun at {}° after sunset", degrees),
            ),
        }
    }

    fn geometric_sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        self.event(date, location, GEOMETRIC_ZENITH, Event::Rising, "geometric sunrise")
    }

    fn geometric_sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        self.event(date, location, GEOMETRIC_ZENITH, Event::Setting, "geometric sunset")
    }
}

fn julian_day(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce()) + JULIAN_DAY_OF_CE_EPOCH
}

fn solar_position(julian_day: f64) -> SolarPosition {
    let t = (julian_day - 2_451_545.0) / 36_525.0;

    let mean_longitude = (280.46646 + t * (36_000.76983 + 0.000_303_2 * t)).rem_euclid(360.0);
    let mean_anomaly = 357.52911 + t * (35_999.05029 - 0.000_153_7 * t);
    let eccentricity = 0.016_708_634 - t * (0.000_042_037 + 0.000_000_126_7 * t);

    let m = mean_anomaly.to_radians();
    let center = m.sin() * (1.914602 - t * (0.004817 + 0.000014 * t))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * t)
        + (3.0 * m).sin() * 0.000289;

    let omega = (125.04 - 1934.136 * t).to_radians();
    let apparent_longitude = mean_longitude + center - 0.00569 - 0.00478 * omega.sin();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - t * (46.815 + t * (0.00059 - t * 0.001813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.00256 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_longitude.to_radians().sin()).asin();

    let y = (obliquity / 2.0).tan().powi(2);
    let l0 = mean_longitude.to_radians();
    let equation = y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
        + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
        - 0.5 * y * y * (4.0 * l0).sin()
        - 1.25 * eccentricity * eccentricity * (2.0 * m).sin();

    SolarPosition {
        declination: declination.to_degrees(),
        equation_of_time: 4.0 * equation.to_degrees(),
    }
}

/// Hour angle in degrees at which the sun reaches `zenith`, or None if it never does
fn hour_angle(latitude: f64, declination: f64, zenith: f64) -> Option<f64> {
    let lat = latitude.to_radians();
    let dec = declination.to_radians();
    let cos_ha = zenith.to_radians().cos() / (lat.cos() * dec.cos()) - lat.tan() * dec.tan();
    if !(-1.0..=1.0).contains(&cos_ha) || cos_ha.is_nan() {
        return None;
    }
    Some(cos_ha.acos().to_degrees())
}

/// Convert minutes after UTC midnight of `date` into the location's offset
fn to_local(date: NaiveDate, minutes: f64, location: &Location) -> ProviderResult {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or(ProviderError::OutOfRange { date })?;
    let millis = (minutes * 60_000.0).round() as i64;
    let utc = midnight
        .checked_add_signed(Duration::milliseconds(millis))
        .ok_or(ProviderError::OutOfRange { date })?;
    Ok(Utc.from_utc_datetime(&utc).with_timezone(&location.utc_offset))
}
