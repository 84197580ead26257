//! `%` wildcard patterns over calendar event titles

use crate::error::ZmanimError;
use crate::ZmanimResult;
use regex::Regex;
use std::fmt;

/// A compiled title pattern
///
/// `%` matches any run of characters (including none); everything else
/// matches literally and case-sensitively. The whole title must match.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> ZmanimResult<Self> {
        let body = pattern
            .split('%')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!("^(?s:{})$", body)).map_err(|e| {
            ZmanimError::Engine(format!("invalid event pattern '{}': {}", pattern, e))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_wildcard(&self) -> bool {
        self.source.contains('%')
    }

    pub fn matches(&self, title: &str) -> bool {
        self.regex.is_match(title)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for WildcardPattern {}

impl fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
