use crate::events::ActiveEventSet;
use crate::Value;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

/// How a computed time is rounded for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 30 seconds or more rounds up
    #[default]
    Math,
    Floor,
    Ceil,
}

impl RoundingMode {
    /// Round `time` to a whole minute
    pub fn apply(&self, time: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let into_minute = Duration::seconds(i64::from(time.second()))
            + Duration::nanoseconds(i64::from(time.nanosecond()));
        let floor = time - into_minute;

        let round_up = match self {
            RoundingMode::Floor => false,
            RoundingMode::Ceil => into_minute > Duration::zero(),
            RoundingMode::Math => time.second() >= 30,
        };

        if round_up {
            floor + Duration::minutes(1)
        } else {
            floor
        }
    }

    /// `HH:MM` after rounding
    pub fn display(&self, time: DateTime<FixedOffset>) -> String {
        self.apply(time).format("%H:%M").to_string()
    }
}

/// Outcome for one requested key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZmanResult {
    pub key: String,
    #[serde(flatten)]
    pub value: Value,
    /// Rounded `HH:MM` for time results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl ZmanResult {
    pub fn new(key: impl Into<String>, value: Value, rounding: RoundingMode) -> Self {
        let display = value.as_time().map(|time| rounding.display(time));
        Self {
            key: key.into(),
            value,
            display,
        }
    }
}

/// Result of one batch run
///
/// Every requested key appears exactly once, in `results` or in `excluded`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub date: NaiveDate,
    pub active_events: ActiveEventSet,
    pub results: Vec<ZmanResult>,
    pub excluded: Vec<String>,
}

impl BatchResponse {
    pub fn get(&self, key: &str) -> Option<&ZmanResult> {
        self.results.iter().find(|result| result.key == key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).map(|result| &result.value)
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded.iter().any(|excluded| excluded == key)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ZmanResult> {
        self.results.iter().filter(|result| result.value.is_error())
    }
}
