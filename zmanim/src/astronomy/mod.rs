//! Astronomical primitives consumed by the evaluator
//!
//! The evaluator never does solar math itself. It asks an
//! [`AstronomicalProvider`] for rise/set/noon times and for the moment the
//! sun crosses a given depression angle. Every call is pure for a given
//! date and location, which is what lets an evaluation run cache results.

pub mod fixed;
pub mod molad;
pub mod noaa;

pub use fixed::FixedProvider;
pub use noaa::NoaaProvider;

use crate::semantic::SolarSide;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Observer position plus the civil UTC offset results are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Metres above sea level
    #[serde(default)]
    pub elevation: f64,
    #[serde(with = "offset_seconds")]
    pub utc_offset: FixedOffset,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, utc_offset: FixedOffset) -> Self {
        Self {
            latitude,
            longitude,
            elevation: 0.0,
            utc_offset,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ProviderError::InvalidLocation(format!(
                "latitude {} is outside -90..90",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ProviderError::InvalidLocation(format!(
                "longitude {} is outside -180..180",
                self.longitude
            )));
        }
        if !self.elevation.is_finite() || self.elevation < 0.0 {
            return Err(ProviderError::InvalidLocation(format!(
                "elevation {} must be a non-negative number of metres",
                self.elevation
            )));
        }
        Ok(())
    }
}

mod offset_seconds {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(offset.local_minus_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedOffset, D::Error> {
        let seconds = i32::deserialize(deserializer)?;
        FixedOffset::east_opt(seconds)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid UTC offset {}s", seconds)))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("{event} does not occur on {date} at this location")]
    NotVisible { event: String, date: NaiveDate },

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("time out of range for {date}")]
    OutOfRange { date: NaiveDate },
}

pub type ProviderResult = Result<DateTime<FixedOffset>, ProviderError>;

/// Source of astronomical event times for a date and location
///
/// Returned times are expressed in `location.utc_offset`.
pub trait AstronomicalProvider: Send + Sync {
    /// Visible sunrise: upper limb on the horizon, refraction and elevation applied
    fn sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult;

    /// Visible sunset
    fn sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult;

    fn solar_noon(&self, date: NaiveDate, location: &Location) -> ProviderResult;

    /// Moment the sun's centre is `degrees` below the horizon on the given side of the day
    fn solar_angle_crossing(
        &self,
        date: NaiveDate,
        location: &Location,
        degrees: f64,
        side: SolarSide,
    ) -> ProviderResult;

    /// Sun's centre on the horizon without refraction
    fn geometric_sunrise(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        self.sunrise(date, location)
    }

    fn geometric_sunset(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        self.sunset(date, location)
    }

    /// The most recent molad as of the end of `date`
    fn molad(&self, date: NaiveDate, location: &Location) -> ProviderResult {
        molad::molad_on_or_before(date, location.utc_offset)
    }
}
