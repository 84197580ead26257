//! Tag-based zman selection
//!
//! Decides from a zman's tags and the day's active events whether the zman
//! applies at all. Runs before evaluation; excluded zmanim are never computed.

use crate::events::ActiveEventSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Event,
    JewishDay,
    Category,
    Timing,
}

impl TagType {
    /// Tags that take part in inclusion decisions
    pub fn is_event_like(&self) -> bool {
        matches!(self, TagType::Event | TagType::JewishDay)
    }
}

/// Timing tag: the zman belongs to the day before the event
pub const DAY_BEFORE: &str = "day_before";
/// Timing tag: the zman belongs to the night after the event
pub const MOTZEI: &str = "motzei";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssociation {
    pub tag_key: String,
    pub tag_type: TagType,
    #[serde(default)]
    pub is_negated: bool,
}

impl TagAssociation {
    pub fn new(tag_key: impl Into<String>, tag_type: TagType) -> Self {
        Self {
            tag_key: tag_key.into(),
            tag_type,
            is_negated: false,
        }
    }

    pub fn event(tag_key: impl Into<String>) -> Self {
        Self::new(tag_key, TagType::Event)
    }

    pub fn jewish_day(tag_key: impl Into<String>) -> Self {
        Self::new(tag_key, TagType::JewishDay)
    }

    pub fn category(tag_key: impl Into<String>) -> Self {
        Self::new(tag_key, TagType::Category)
    }

    pub fn timing(tag_key: impl Into<String>) -> Self {
        Self::new(tag_key, TagType::Timing)
    }

    pub fn negated(mut self) -> Self {
        self.is_negated = true;
        self
    }
}

fn is_active(tag_key: &str, active: &ActiveEventSet, day_before: bool) -> bool {
    if day_before {
        active.contains(&format!("erev_{}", tag_key))
    } else {
        active.contains(tag_key)
    }
}

/// Whether a zman with `tags` applies given the `active` events
///
/// Category tags never matter. A zman with no event tags is always included.
/// A negated tag that is active excludes the zman outright; otherwise the zman
/// is included when it has no positive tags or at least one of them is active.
/// A `day_before` timing tag makes positive tags match `erev_<tag>` instead;
/// negated tags are always checked as written.
pub fn should_include(tags: &[TagAssociation], active: &ActiveEventSet) -> bool {
    let day_before = tags
        .iter()
        .any(|tag| tag.tag_type == TagType::Timing && tag.tag_key == DAY_BEFORE);

    let event_tags: Vec<&TagAssociation> = tags
        .iter()
        .filter(|tag| tag.tag_type.is_event_like())
        .collect();

    if event_tags.is_empty() {
        return true;
    }

    if event_tags
        .iter()
        .any(|tag| tag.is_negated && active.contains(&tag.tag_key))
    {
        return false;
    }

    let mut positive = event_tags.iter().filter(|tag| !tag.is_negated).peekable();
    if positive.peek().is_none() {
        return true;
    }
    positive.any(|tag| is_active(&tag.tag_key, active, day_before))
}
