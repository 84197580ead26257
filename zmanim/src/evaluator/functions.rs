//! Builtin function library
//!
//! Signatures drive the validator; the arithmetic helpers below are the
//! pure parts of each builtin once its arguments have been resolved.

use crate::error::ZmanimError;
use crate::semantic::{Direction, SolarSide};
use crate::validator::{DomainViolation, StaticType};
use crate::ZmanimResult;
use chrono::{DateTime, Duration, FixedOffset};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Kind of argument a builtin expects at each position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Number,
    Direction,
    Base,
    Time,
}

#[derive(Debug)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub params: &'static [ArgKind],
    pub returns: StaticType,
    pub usage: &'static str,
}

pub const FUNCTIONS: &[FunctionSignature] = &[
    FunctionSignature {
        name: "solar",
        params: &[ArgKind::Number, ArgKind::Direction],
        returns: StaticType::Time,
        usage: "solar(degrees, before_sunrise | after_sunset)",
    },
    FunctionSignature {
        name: "seasonal_solar",
        params: &[ArgKind::Number, ArgKind::Direction],
        returns: StaticType::Time,
        usage: "seasonal_solar(degrees, before_sunrise | after_sunset)",
    },
    FunctionSignature {
        name: "proportional_hours",
        params: &[ArgKind::Number, ArgKind::Base],
        returns: StaticType::Time,
        usage: "proportional_hours(hours, gra | mga | custom(start, end))",
    },
    FunctionSignature {
        name: "proportional_minutes",
        params: &[ArgKind::Number, ArgKind::Direction],
        returns: StaticType::Time,
        usage: "proportional_minutes(minutes, before_sunrise | after_sunset)",
    },
    FunctionSignature {
        name: "shaah_zmanis",
        params: &[ArgKind::Base],
        returns: StaticType::Duration,
        usage: "shaah_zmanis(gra | mga | custom(start, end))",
    },
    FunctionSignature {
        name: "midpoint",
        params: &[ArgKind::Time, ArgKind::Time],
        returns: StaticType::Time,
        usage: "midpoint(time1, time2)",
    },
];

pub fn signature(name: &str) -> Option<&'static FunctionSignature> {
    FUNCTIONS.iter().find(|signature| signature.name == name)
}

/// Domain of the numeric first argument of each builtin
pub fn check_numeric_domain(function: &str, value: Decimal) -> Result<(), DomainViolation> {
    match function {
        "solar" | "seasonal_solar" => {
            if value <= Decimal::ZERO || value >= Decimal::from(90) {
                return Err(DomainViolation {
                    message: format!(
                        "{}() degrees must be between 0 and 90 exclusive, found {}",
                        function,
                        value.normalize()
                    ),
                    suggestion: Some(
                        "Common values: 8.5° (Tzais), 11.5° (Misheyakir), 16.1° (Alos/MGA)",
                    ),
                });
            }
        }
        "proportional_hours" => {
            if value < Decimal::new(5, 1) || value > Decimal::from(12) {
                return Err(DomainViolation {
                    message: format!(
                        "proportional_hours() hours must be between 0.5 and 12, found {}",
                        value.normalize()
                    ),
                    suggestion: Some("Common values: 3 (Shema), 4 (Tefila), 6.5 (Mincha Gedola)"),
                });
            }
        }
        "proportional_minutes" => {
            if value <= Decimal::ZERO || value > Decimal::from(200) {
                return Err(DomainViolation {
                    message: format!(
                        "proportional_minutes() minutes must be greater than 0 and at most 200, found {}",
                        value.normalize()
                    ),
                    suggestion: Some("Common values: 72, 90, 96, 120"),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn check_direction(function: &str, direction: Direction) -> Result<(), DomainViolation> {
    let edge_only = matches!(function, "proportional_minutes" | "seasonal_solar");
    if edge_only && !direction.is_day_edge_offset() {
        return Err(DomainViolation {
            message: format!(
                "{}() cannot be measured {}",
                function,
                direction.as_str().replace('_', " ")
            ),
            suggestion: Some("use before_sunrise or after_sunset"),
        });
    }
    Ok(())
}

pub(crate) fn overflow(what: &str) -> ZmanimError {
    ZmanimError::Computation(format!("{} is out of range", what))
}

/// Convert a (possibly fractional) number of minutes to a duration, to the millisecond
pub fn minutes_to_duration(minutes: Decimal) -> ZmanimResult<Duration> {
    let millis = minutes
        .checked_mul(Decimal::from(60_000))
        .ok_or_else(|| overflow("duration"))?
        .round()
        .to_i64()
        .ok_or_else(|| overflow("duration"))?;
    Duration::try_milliseconds(millis).ok_or_else(|| overflow("duration"))
}

/// Multiply a duration by a decimal factor, to the millisecond
pub fn scale_duration(duration: Duration, factor: Decimal) -> ZmanimResult<Duration> {
    let millis = Decimal::from(duration.num_milliseconds())
        .checked_mul(factor)
        .ok_or_else(|| overflow("duration"))?
        .round()
        .to_i64()
        .ok_or_else(|| overflow("duration"))?;
    Duration::try_milliseconds(millis).ok_or_else(|| overflow("duration"))
}

pub fn shift(time: DateTime<FixedOffset>, offset: Duration) -> ZmanimResult<DateTime<FixedOffset>> {
    time.checked_add_signed(offset)
        .ok_or_else(|| overflow("time"))
}

/// Length of the day between two boundaries, which must be in order
fn day_length(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> ZmanimResult<Duration> {
    if end <= start {
        return Err(ZmanimError::Computation(format!(
            "invalid day duration: day ends at {} but starts at {}",
            end.format("%H:%M:%S"),
            start.format("%H:%M:%S")
        )));
    }
    Ok(end - start)
}

/// `start + hours × (end − start) / 12`
pub fn proportional_hours(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    hours: Decimal,
) -> ZmanimResult<DateTime<FixedOffset>> {
    let offset = scale_duration(day_length(start, end)?, hours / Decimal::from(12))?;
    shift(start, offset)
}

/// One twelfth of the day between `start` and `end`
pub fn shaah_zmanis(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> ZmanimResult<Duration> {
    scale_duration(day_length(start, end)?, Decimal::ONE / Decimal::from(12))
}

/// Offset `anchor` by `minutes` zmaniyos: minutes scaled by the day length over a 720-minute day
pub fn proportional_minutes(
    sunrise: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
    anchor: DateTime<FixedOffset>,
    minutes: Decimal,
    side: SolarSide,
) -> ZmanimResult<DateTime<FixedOffset>> {
    let offset = scale_duration(sunset - sunrise, minutes / Decimal::from(720))?;
    match side {
        SolarSide::Morning => shift(anchor, -offset),
        SolarSide::Evening => shift(anchor, offset),
    }
}

/// Scale a twilight offset measured on the equinox by today's day length
/// over the equinox day length
pub fn seasonal_offset(
    equinox_offset: Duration,
    equinox_day: Duration,
    day: Duration,
) -> ZmanimResult<Duration> {
    if equinox_day <= Duration::zero() || day <= Duration::zero() {
        return Err(ZmanimError::Computation(
            "invalid day duration for a seasonal angle".to_string(),
        ));
    }
    let ratio = Decimal::from(day.num_milliseconds())
        .checked_div(Decimal::from(equinox_day.num_milliseconds()))
        .ok_or_else(|| overflow("day length ratio"))?;
    scale_duration(equinox_offset, ratio)
}

pub fn midpoint(
    first: DateTime<FixedOffset>,
    second: DateTime<FixedOffset>,
) -> ZmanimResult<DateTime<FixedOffset>> {
    let half = scale_duration(second - first, Decimal::new(5, 1))?;
    shift(first, half)
}
