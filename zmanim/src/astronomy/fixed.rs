//! A provider with the same sunrise and sunset every day
//!
//! Useful for deterministic tests and for checking formulas by hand: with
//! sunrise 06:00 and sunset 18:00 every proportional hour is exactly 60 minutes.

use super::{AstronomicalProvider, Location, ProviderError, ProviderResult};
use crate::semantic::SolarSide;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};

/// Minutes the sun takes to descend one degree in this model
const MINUTES_PER_DEGREE: f64 = 4.0;

#[derive(Debug, Clone, Copy)]
pub struct FixedProvider {
    sunrise: NaiveTime,
    sunset: NaiveTime,
    visible: bool,
}

impl FixedProvider {
    pub fn new(sunrise: NaiveTime, sunset: NaiveTime) -> Self {
        Self {
            sunrise,
            sunset,
            visible: true,
        }
    }

    /// A provider for which the sun never rises or sets
    pub fn polar_night() -> Self {
        Self {
            sunrise: NaiveTime::MIN,
            sunset: NaiveTime::MIN,
            visible: false,
        }
    }

    fn at(
        &self,
        date: NaiveDate,
        location: &Location,
        time: NaiveTime,
        event: &str,
    ) -> ProviderResult {
        if !self.visible {
            return Err(ProviderError::NotVisible {
                event: event.to_string(),
                date,
            });
        }
        local(date, location, time)
    }
}

fn local(date: NaiveDate, location: &Location, time: NaiveTime) -> ProviderResult {
    location
        .utc_offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or(ProviderError::OutOfRange { date })
}

fn shifted(base: DateTime<FixedOffset>, minutes: f64, date: NaiveDate) -> ProviderResult {
    let millis = (minutes * 60_000.0).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
        .ok_or(ProviderError::OutOfRange { date })
}

impl AstronomicalProvider for FixedProvider {
    fn sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        self.at(date, location, self.sunrise, "sunrise")
    }

    fn sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        self.at(date, location, self.sunset, "sunset")
    }

    fn solar_noon(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        let sunrise = self.sunrise(date, location)?;
        let sunset = self.sunset(date, location)?;
        Ok(sunrise + (sunset - sunrise) / 2)
    }

    fn solar_angle_crossing(
        &self,
        date: NaiveDate,
        location: &Location,
        degrees: f64,
        side: SolarSide,
    ) -> ProviderResult {
        match side {
            SolarSide::Morning => {
                shifted(self.sunrise(date, location)?, -degrees * MINUTES_PER_DEGREE, date)
            }
            SolarSide::Evening => {
                shifted(self.sunset(date, location)?, degrees * MINUTES_PER_DEGREE, date)
            }
        }
    }
}
