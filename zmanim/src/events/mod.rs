//! Calendar event classification
//!
//! Maps free-text calendar titles for one date onto the set of event tag
//! codes that zman selection works with.

pub mod pattern;

pub use pattern::WildcardPattern;

use crate::ZmanimResult;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// One row of the event pattern table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatternMapping {
    pub pattern: String,
    #[serde(default)]
    pub priority: i32,
    pub tag_key: String,
}

impl EventPatternMapping {
    pub fn new(pattern: impl Into<String>, tag_key: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            priority: 0,
            tag_key: tag_key.into(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Event tag codes active on one date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveEventSet(BTreeSet<String>);

impl ActiveEventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tag_key: &str) -> bool {
        self.0.contains(tag_key)
    }

    pub fn insert(&mut self, tag_key: impl Into<String>) -> bool {
        self.0.insert(tag_key.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ActiveEventSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ActiveEventSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

#[derive(Debug, Clone)]
struct CompiledMapping {
    pattern: WildcardPattern,
    priority: i32,
    tag_key: String,
}

/// Compiled pattern table
///
/// Every mapping whose pattern matches any title contributes its tag.
/// Mappings are kept ordered by priority, then pattern, but priority never
/// suppresses a match.
#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    mappings: Vec<CompiledMapping>,
    weekday_events: bool,
}

impl EventClassifier {
    pub fn new(mappings: &[EventPatternMapping]) -> ZmanimResult<Self> {
        let mut compiled = mappings
            .iter()
            .map(|mapping| {
                Ok(CompiledMapping {
                    pattern: WildcardPattern::new(&mapping.pattern)?,
                    priority: mapping.priority,
                    tag_key: mapping.tag_key.clone(),
                })
            })
            .collect::<ZmanimResult<Vec<_>>>()?;

        compiled.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.pattern.as_str().cmp(b.pattern.as_str()))
        });

        Ok(Self {
            mappings: compiled,
            weekday_events: false,
        })
    }

    /// Also report `shabbos` on Saturdays and `erev_shabbos` on Fridays
    pub fn with_weekday_events(mut self, enabled: bool) -> Self {
        self.weekday_events = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn classify<S: AsRef<str>>(&self, titles: &[S], date: NaiveDate) -> ActiveEventSet {
        let mut active = ActiveEventSet::new();

        for title in titles {
            let title = title.as_ref();
            for mapping in &self.mappings {
                if mapping.pattern.matches(title) {
                    debug!(
                        %date,
                        title,
                        pattern = mapping.pattern.as_str(),
                        tag = mapping.tag_key.as_str(),
                        "event pattern matched"
                    );
                    active.insert(mapping.tag_key.as_str());
                }
            }
        }

        if self.weekday_events {
            match date.weekday() {
                Weekday::Fri => {
                    active.insert("erev_shabbos");
                }
                Weekday::Sat => {
                    active.insert("shabbos");
                }
                _ => {}
            }
        }

        active
    }
}

/// Classify `titles` against `mappings` in one call
pub fn classify<S: AsRef<str>>(
    titles: &[S],
    mappings: &[EventPatternMapping],
    date: NaiveDate,
) -> ZmanimResult<ActiveEventSet> {
    Ok(EventClassifier::new(mappings)?.classify(titles, date))
}
