use crate::error::{ErrorKind, ZmanimError};
use crate::ZmanimResult;
use chrono::{DateTime, Duration, FixedOffset};
use serde::{Serialize, Serializer};
use std::fmt;

/// Result of evaluating a formula
///
/// Errors are values: a failed sub-expression becomes the value of its
/// parent instead of aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Time(DateTime<FixedOffset>),
    Duration(Duration),
    Error(ZmanimError),
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn as_time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Time(time) => Some(*time),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(duration) => Some(*duration),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ZmanimError> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_result(self) -> ZmanimResult<Value> {
        match self {
            Value::Error(error) => Err(error),
            other => Ok(other),
        }
    }
}

impl From<ZmanimResult<Value>> for Value {
    fn from(result: ZmanimResult<Value>) -> Self {
        match result {
            Ok(value) => value,
            Err(error) => Value::Error(error),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Time(time) => write!(f, "{}", time.format("%H:%M:%S")),
            Value::Duration(duration) => write!(f, "{}", format_duration(*duration)),
            Value::Error(error) => write!(f, "{}", error),
        }
    }
}

/// `1h 12m 30s`, with a leading minus for negative durations
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 || (hours > 0 && seconds > 0) {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    format!("{}{}", sign, parts.join(" "))
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ValueRepr<'a> {
    Time {
        time: &'a DateTime<FixedOffset>,
    },
    Duration {
        seconds: i64,
        display: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Value::Time(time) => ValueRepr::Time { time },
            Value::Duration(duration) => ValueRepr::Duration {
                seconds: duration.num_seconds(),
                display: format_duration(*duration),
            },
            Value::Error(error) => ValueRepr::Error {
                kind: error.kind(),
                message: error.to_string(),
            },
        };
        repr.serialize(serializer)
    }
}
