

// Evaluator tests
mod evaluation;
mod references;



use crate::astronomy::{FixedProvider, Location};
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use std::collections::HashMap;

pub(crate) fn equinox() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
}

pub(crate) fn utc_location() -> Location {
    Location::new(31.778, 35.235, FixedOffset::east_opt(0).unwrap())
}

/// Sunrise 06:00, sunset 18:00: every proportional hour is 60 minutes
pub(crate) fn twelve_hour_day() -> FixedProvider {
    FixedProvider::new(
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    )
}

pub(crate) fn registry(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(key, formula)| (key.to_string(), formula.to_string()))
        .collect()
}

pub(crate) fn hm(value: &crate::Value) -> String {
    value
        .as_time()
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| format!("not a time: {:?}", value))
}
