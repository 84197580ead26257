//! Mean molad arithmetic
//!
//! The molad is computed from the fixed mean lunation of the Hebrew calendar,
//! counted in chalakim (1/1080 of an hour) from the molad of Tishrei, year 1.
//! Results are in Jerusalem mean time and converted to the caller's offset.

use super::{ProviderError, ProviderResult};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

pub const PARTS_PER_HOUR: i64 = 1080;
pub const PARTS_PER_DAY: i64 = 24 * PARTS_PER_HOUR;

/// 29 days, 12 hours and 793 parts
pub const LUNATION_PARTS: i64 = 29 * PARTS_PER_DAY + 12 * PARTS_PER_HOUR + 793;

/// Molad BaHaRaD in parts since midnight of R.D. 0, Jerusalem mean time
const EPOCH_PARTS: i64 = -1_373_427 * PARTS_PER_DAY - 876;

/// Jerusalem mean time is UTC+2:20:56
pub const JERUSALEM_MEAN_TIME_SECS: i32 = 8456;

const MILLIS_PER_DAY: i64 = 86_400_000;

fn out_of_range(date: NaiveDate) -> ProviderError {
    ProviderError::OutOfRange { date }
}

/// The latest molad that is not after the end of `date` in the given offset
pub fn molad_on_or_before(date: NaiveDate, offset: FixedOffset) -> ProviderResult {
    let end_of_day = date
        .succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .ok_or_else(|| out_of_range(date))?;

    let shift = i64::from(JERUSALEM_MEAN_TIME_SECS - offset.local_minus_utc());
    let jerusalem = end_of_day
        .checked_add_signed(Duration::seconds(shift))
        .ok_or_else(|| out_of_range(date))?;

    let seconds = i64::from(jerusalem.date().num_days_from_ce()) * 86_400
        + i64::from(jerusalem.time().num_seconds_from_midnight());
    // One part is 10/3 seconds.
    let limit_parts = (seconds * 3).div_euclid(10);
    let lunations = (limit_parts - 1 - EPOCH_PARTS).div_euclid(LUNATION_PARTS);

    molad_of_lunation(lunations, offset).ok_or_else(|| out_of_range(date))
}

/// Molad number `lunations` counted from Tishrei of year 1
pub fn molad_of_lunation(
    lunations: i64,
    offset: FixedOffset,
) -> Option<chrono::DateTime<FixedOffset>> {
    let parts = EPOCH_PARTS.checked_add(lunations.checked_mul(LUNATION_PARTS)?)?;
    let millis = parts.checked_mul(10_000)?.div_euclid(3);

    let days = i32::try_from(millis.div_euclid(MILLIS_PER_DAY)).ok()?;
    let millis_of_day = millis.rem_euclid(MILLIS_PER_DAY);

    let jerusalem: NaiveDateTime = NaiveDate::from_num_days_from_ce_opt(days)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis_of_day))?;
    let utc = jerusalem.checked_sub_signed(Duration::seconds(i64::from(JERUSALEM_MEAN_TIME_SECS)))?;

    Some(Utc.from_utc_datetime(&utc).with_timezone(&offset))
}
