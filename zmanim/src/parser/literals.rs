use crate::ast::Span;
use crate::error::ZmanimError;
use crate::parser::Rule;
use crate::semantic::{month_number, DurationUnit, Season};

use chrono::{NaiveDate, NaiveTime};
use pest::iterators::Pair;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

fn literal_error(message: String, pair: &Pair<Rule>, source: &Arc<str>) -> ZmanimError {
    ZmanimError::parse(message, Span::from_pest_span(pair.as_span()), source.clone())
}

pub(crate) fn parse_number_literal(
    pair: &Pair<Rule>,
    source: &Arc<str>,
) -> Result<Decimal, ZmanimError> {
    Decimal::from_str(pair.as_str())
        .map_err(|e| literal_error(format!("invalid number '{}': {}", pair.as_str(), e), pair, source))
}

/// Parse `72min`, `1.5 hours`, `14days` into magnitude and unit
pub(crate) fn parse_duration_literal(
    pair: &Pair<Rule>,
    source: &Arc<str>,
) -> Result<(Decimal, DurationUnit), ZmanimError> {
    let mut magnitude = None;
    let mut unit = None;

    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::decimal => magnitude = Some(parse_number_literal(&inner, source)?),
            Rule::duration_unit => unit = DurationUnit::from_suffix(inner.as_str()),
            _ => {}
        }
    }

    match (magnitude, unit) {
        (Some(magnitude), Some(unit)) => Ok((magnitude, unit)),
        _ => Err(literal_error(
            format!("invalid duration '{}'", pair.as_str()),
            pair,
            source,
        )),
    }
}

/// Parse `HH:MM` or `HH:MM:SS` as a local wall-clock time
pub(crate) fn parse_clock_time(
    pair: &Pair<Rule>,
    source: &Arc<str>,
) -> Result<NaiveTime, ZmanimError> {
    let text = pair.as_str();
    let mut parts = text.split(':').map(|part| part.parse::<u32>());

    let hour = parts.next();
    let minute = parts.next();
    let second = parts.next().unwrap_or(Ok(0));

    let time = match (hour, minute, second) {
        (Some(Ok(h)), Some(Ok(m)), Ok(s)) => NaiveTime::from_hms_opt(h, m, s),
        _ => None,
    };

    time.ok_or_else(|| {
        ZmanimError::parse_with_suggestion(
            format!("invalid clock time '{}'", text),
            Span::from_pest_span(pair.as_span()),
            source.clone(),
            "use 24-hour HH:MM, e.g. 18:30",
        )
    })
}

/// Parse `21-May` into (day, month); the day must exist in a leap year
pub(crate) fn parse_date_literal(
    pair: &Pair<Rule>,
    source: &Arc<str>,
) -> Result<(u32, u32), ZmanimError> {
    let text = pair.as_str();
    let parsed = text.split_once('-').and_then(|(day, month)| {
        Some((day.parse::<u32>().ok()?, month_number(month)?))
    });

    match parsed {
        Some((day, month)) if NaiveDate::from_ymd_opt(2024, month, day).is_some() => {
            Ok((day, month))
        }
        _ => Err(ZmanimError::parse_with_suggestion(
            format!("invalid date '{}'", text),
            Span::from_pest_span(pair.as_span()),
            source.clone(),
            "write day-month, e.g. 21-May",
        )),
    }
}

pub(crate) fn parse_season_literal(
    pair: &Pair<Rule>,
    source: &Arc<str>,
) -> Result<Season, ZmanimError> {
    pair.clone()
        .into_inner()
        .next()
        .and_then(|name| Season::from_identifier(name.as_str()))
        .ok_or_else(|| literal_error(format!("invalid season {}", pair.as_str()), pair, source))
}
