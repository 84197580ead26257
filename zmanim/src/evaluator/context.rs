//! Per-run evaluation state
//!
//! An `ExecutionContext` covers one date, one location and one batch of
//! requested keys. It owns the memo of computed zmanim, the cache of
//! provider answers and the cache of parsed formulas, and is dropped when
//! the batch completes. All caches sit behind mutexes so a host may
//! evaluate independent keys from several threads against one context.

use super::timeout::TimeoutTracker;
use crate::astronomy::{AstronomicalProvider, Location, ProviderResult};
use crate::error::ZmanimError;
use crate::parser::parse_with_limits;
use crate::semantic::{Expression, Primitive, SolarSide};
use crate::validator::Validator;
use crate::{ResourceLimits, Value, ZmanimResult};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Read-only lookup from zman key to formula source text
pub trait FormulaRegistry: Send + Sync {
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl FormulaRegistry for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Provider queries, keyed with their date for memoization within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AstroQuery {
    Sunrise,
    Sunset,
    GeometricSunrise,
    GeometricSunset,
    SolarNoon,
    Crossing { degrees_bits: u64, side: SolarSide },
    Molad,
}

/// A formula that parsed and validated
#[derive(Debug)]
pub struct ParsedFormula {
    pub expression: Expression,
    pub source: Arc<str>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ExecutionContext<'a> {
    date: NaiveDate,
    location: Location,
    registry: &'a dyn FormulaRegistry,
    provider: &'a dyn AstronomicalProvider,
    limits: ResourceLimits,
    memo: Mutex<HashMap<String, Value>>,
    astro_cache: Mutex<HashMap<(NaiveDate, AstroQuery), ProviderResult>>,
    parsed: Mutex<HashMap<String, Result<Arc<ParsedFormula>, ZmanimError>>>,
    timeout: TimeoutTracker,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        date: NaiveDate,
        location: Location,
        registry: &'a dyn FormulaRegistry,
        provider: &'a dyn AstronomicalProvider,
    ) -> Self {
        Self {
            date,
            location,
            registry,
            provider,
            limits: ResourceLimits::default(),
            memo: Mutex::new(HashMap::new()),
            astro_cache: Mutex::new(HashMap::new()),
            parsed: Mutex::new(HashMap::new()),
            timeout: TimeoutTracker::new(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn lookup(&self, key: &str) -> Option<&'a str> {
        self.registry.lookup(key)
    }

    pub fn memoized(&self, key: &str) -> Option<Value> {
        lock(&self.memo).get(key).cloned()
    }

    /// Store the value for `key` unless one is already present; returns the stored value
    pub fn memoize(&self, key: &str, value: Value) -> Value {
        lock(&self.memo)
            .entry(key.to_string())
            .or_insert(value)
            .clone()
    }

    pub fn check_timeout(&self) -> ZmanimResult<()> {
        self.timeout.check_timeout(&self.limits)
    }

    /// Parse and validate `source`, caching the outcome by source text
    pub fn parsed(&self, source: &str) -> Result<Arc<ParsedFormula>, ZmanimError> {
        if let Some(cached) = lock(&self.parsed).get(source) {
            return cached.clone();
        }

        let outcome = parse_with_limits(source, &self.limits).and_then(|expression| {
            let source_text: Arc<str> = Arc::from(source);
            Validator::new(source_text.clone()).validate(&expression)?;
            Ok(Arc::new(ParsedFormula {
                expression,
                source: source_text,
            }))
        });

        lock(&self.parsed)
            .entry(source.to_string())
            .or_insert(outcome)
            .clone()
    }

    fn query(&self, query: AstroQuery) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query_on(self.date, query)
    }

    fn query_on(&self, date: NaiveDate, query: AstroQuery) -> ZmanimResult<DateTime<FixedOffset>> {
        if let Some(cached) = lock(&self.astro_cache).get(&(date, query)) {
            return cached.clone().map_err(ZmanimError::from);
        }

        let location = &self.location;
        let answer = match query {
            AstroQuery::Sunrise => self.provider.sunrise(date, location),
            AstroQuery::Sunset => self.provider.sunset(date, location),
            AstroQuery::GeometricSunrise => self.provider.geometric_sunrise(date, location),
            AstroQuery::GeometricSunset => self.provider.geometric_sunset(date, location),
            AstroQuery::SolarNoon => self.provider.solar_noon(date, location),
            AstroQuery::Crossing { degrees_bits, side } => self.provider.solar_angle_crossing(
                date,
                location,
                f64::from_bits(degrees_bits),
                side,
            ),
            AstroQuery::Molad => self.provider.molad(date, location),
        };

        lock(&self.astro_cache)
            .entry((date, query))
            .or_insert(answer)
            .clone()
            .map_err(ZmanimError::from)
    }

    pub fn sunrise(&self) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::Sunrise)
    }

    pub fn sunset(&self) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::Sunset)
    }

    pub fn geometric_sunrise(&self) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::GeometricSunrise)
    }

    pub fn geometric_sunset(&self) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::GeometricSunset)
    }

    pub fn solar_noon(&self) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::SolarNoon)
    }

    pub fn solar_angle_crossing(
        &self,
        degrees: f64,
        side: SolarSide,
    ) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::Crossing {
            degrees_bits: degrees.to_bits(),
            side,
        })
    }

    /// Reference day for seasonal angles: 20 March of the run's year
    pub fn march_equinox(&self) -> ZmanimResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.date.year(), 3, 20).ok_or_else(|| {
            ZmanimError::Computation(format!("no equinox in year {}", self.date.year()))
        })
    }

    /// Sunrise or sunset on `date`, visible or geometric
    pub fn horizon_on(
        &self,
        date: NaiveDate,
        side: SolarSide,
        geometric: bool,
    ) -> ZmanimResult<DateTime<FixedOffset>> {
        let query = match (side, geometric) {
            (SolarSide::Morning, false) => AstroQuery::Sunrise,
            (SolarSide::Evening, false) => AstroQuery::Sunset,
            (SolarSide::Morning, true) => AstroQuery::GeometricSunrise,
            (SolarSide::Evening, true) => AstroQuery::GeometricSunset,
        };
        self.query_on(date, query)
    }

    pub fn crossing_on(
        &self,
        date: NaiveDate,
        degrees: f64,
        side: SolarSide,
    ) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query_on(
            date,
            AstroQuery::Crossing {
                degrees_bits: degrees.to_bits(),
                side,
            },
        )
    }

    /// Visible sunrise to visible sunset on `date`
    pub fn day_length_on(&self, date: NaiveDate) -> ZmanimResult<Duration> {
        Ok(self.query_on(date, AstroQuery::Sunset)? - self.query_on(date, AstroQuery::Sunrise)?)
    }

    pub fn molad(&self) -> ZmanimResult<DateTime<FixedOffset>> {
        self.query(AstroQuery::Molad)
    }

    pub fn primitive(&self, primitive: Primitive) -> ZmanimResult<DateTime<FixedOffset>> {
        match primitive {
            Primitive::Sunrise | Primitive::VisibleSunrise => self.sunrise(),
            Primitive::Sunset | Primitive::VisibleSunset => self.sunset(),
            Primitive::GeometricSunrise => self.geometric_sunrise(),
            Primitive::GeometricSunset => self.geometric_sunset(),
            Primitive::SolarNoon => self.solar_noon(),
            Primitive::SolarMidnight => self
                .solar_noon()?
                .checked_sub_signed(Duration::hours(12))
                .ok_or_else(|| ZmanimError::Computation("solar midnight is out of range".to_string())),
            Primitive::CivilDawn => self.solar_angle_crossing(6.0, SolarSide::Morning),
            Primitive::CivilDusk => self.solar_angle_crossing(6.0, SolarSide::Evening),
            Primitive::NauticalDawn => self.solar_angle_crossing(12.0, SolarSide::Morning),
            Primitive::NauticalDusk => self.solar_angle_crossing(12.0, SolarSide::Evening),
            Primitive::AstronomicalDawn => self.solar_angle_crossing(18.0, SolarSide::Morning),
            Primitive::AstronomicalDusk => self.solar_angle_crossing(18.0, SolarSide::Evening),
            Primitive::Molad => self.molad(),
        }
    }

    /// A wall-clock time on the run's date in the location's offset
    pub fn local_time(&self, time: NaiveTime) -> ZmanimResult<DateTime<FixedOffset>> {
        self.location
            .utc_offset
            .from_local_datetime(&self.date.and_time(time))
            .single()
            .ok_or_else(|| ZmanimError::Computation(format!("{} is not a valid local time", time)))
    }
}
