use crate::astronomy::{AstronomicalProvider, Location};
use crate::error::ZmanimError;
use crate::evaluator::{Evaluator, ExecutionContext, FormulaRegistry};
use crate::events::{ActiveEventSet, EventClassifier, EventPatternMapping};
use crate::response::{BatchResponse, RoundingMode, ZmanResult};
use crate::selector::{should_include, TagAssociation};
use crate::semantic::Expression;
use crate::validator::Validator;
use crate::{parse_with_limits, ResourceLimits, ZmanimResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// A named formula with its selection tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZmanDefinition {
    pub key: String,
    pub formula: String,
    #[serde(default)]
    pub tags: Vec<TagAssociation>,
    #[serde(default)]
    pub rounding: RoundingMode,
}

impl ZmanDefinition {
    pub fn new(key: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            formula: formula.into(),
            tags: Vec::new(),
            rounding: RoundingMode::default(),
        }
    }

    pub fn with_tag(mut self, tag: TagAssociation) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }
}

/// One date, one location, a set of keys and the day's calendar titles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub date: NaiveDate,
    pub location: Location,
    /// `None` requests every registered zman in registration order
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub event_titles: Vec<String>,
}

impl BatchRequest {
    pub fn new(date: NaiveDate, location: Location) -> Self {
        Self {
            date,
            location,
            keys: None,
            event_titles: Vec::new(),
        }
    }

    pub fn with_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_event_title(mut self, title: impl Into<String>) -> Self {
        self.event_titles.push(title.into());
        self
    }
}

/// Registered zmanim, kept in registration order
#[derive(Debug, Clone, Default)]
struct ZmanTable {
    definitions: Vec<ZmanDefinition>,
    index: HashMap<String, usize>,
}

impl ZmanTable {
    fn get(&self, key: &str) -> Option<&ZmanDefinition> {
        self.index.get(key).map(|&i| &self.definitions[i])
    }
}

impl FormulaRegistry for ZmanTable {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(|definition| definition.formula.as_str())
    }
}

/// The zmanim engine.
///
/// Holds the formula registry and the event pattern table. Both are
/// read-only while a batch runs; each batch gets its own execution context.
pub struct Engine {
    provider: Box<dyn AstronomicalProvider>,
    zmanim: ZmanTable,
    patterns: Vec<EventPatternMapping>,
    classifier: EventClassifier,
    weekday_events: bool,
    limits: ResourceLimits,
}

impl Engine {
    pub fn new(provider: impl AstronomicalProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            zmanim: ZmanTable::default(),
            patterns: Vec::new(),
            classifier: EventClassifier::default(),
            weekday_events: false,
            limits: ResourceLimits::default(),
        }
    }

    /// Create an engine with custom resource limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Report `shabbos` / `erev_shabbos` from the weekday alone
    pub fn with_weekday_events(mut self, enabled: bool) -> Self {
        self.weekday_events = enabled;
        self.classifier = self.classifier.with_weekday_events(enabled);
        self
    }

    /// Get the current resource limits
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Register a zman. Formulas are checked lazily, at evaluation time,
    /// so a broken formula only fails its own key.
    pub fn add_zman(&mut self, definition: ZmanDefinition) -> ZmanimResult<()> {
        if definition.key.trim().is_empty() {
            return Err(ZmanimError::Engine("zman key must not be empty".to_string()));
        }
        if self.zmanim.index.contains_key(&definition.key) {
            return Err(ZmanimError::Engine(format!(
                "zman '{}' is already registered",
                definition.key
            )));
        }

        self.zmanim
            .index
            .insert(definition.key.clone(), self.zmanim.definitions.len());
        self.zmanim.definitions.push(definition);
        Ok(())
    }

    pub fn add_zmanim(
        &mut self,
        definitions: impl IntoIterator<Item = ZmanDefinition>,
    ) -> ZmanimResult<()> {
        for definition in definitions {
            self.add_zman(definition)?;
        }
        Ok(())
    }

    pub fn add_event_patterns(
        &mut self,
        mappings: impl IntoIterator<Item = EventPatternMapping>,
    ) -> ZmanimResult<()> {
        let mut patterns = self.patterns.clone();
        patterns.extend(mappings);

        self.classifier =
            EventClassifier::new(&patterns)?.with_weekday_events(self.weekday_events);
        self.patterns = patterns;
        Ok(())
    }

    pub fn zmanim(&self) -> &[ZmanDefinition] {
        &self.zmanim.definitions
    }

    pub fn get_zman(&self, key: &str) -> Option<&ZmanDefinition> {
        self.zmanim.get(key)
    }

    pub fn event_patterns(&self) -> &[EventPatternMapping] {
        &self.patterns
    }

    pub fn classify<S: AsRef<str>>(&self, titles: &[S], date: NaiveDate) -> ActiveEventSet {
        self.classifier.classify(titles, date)
    }

    /// Parse and validate formula text without evaluating it
    pub fn check_formula(&self, source: &str) -> ZmanimResult<Expression> {
        let expression = parse_with_limits(source, &self.limits)?;
        Validator::new(Arc::from(source)).validate(&expression)?;
        Ok(expression)
    }

    /// Run one batch
    ///
    /// Classifies the titles once, drops the keys the selector rejects and
    /// evaluates the rest. Per-key failures are reported as error values;
    /// the batch itself always completes.
    pub fn calculate(&self, request: &BatchRequest) -> BatchResponse {
        let active_events = self.classify(&request.event_titles, request.date);

        let keys: Vec<String> = match &request.keys {
            Some(keys) => keys.clone(),
            None => self
                .zmanim
                .definitions
                .iter()
                .map(|definition| definition.key.clone())
                .collect(),
        };

        let context = ExecutionContext::new(
            request.date,
            request.location,
            &self.zmanim,
            self.provider.as_ref(),
        )
        .with_limits(self.limits.clone());

        let mut results = Vec::new();
        let mut excluded = Vec::new();
        let mut seen = HashSet::new();

        for key in keys {
            if !seen.insert(key.clone()) {
                continue;
            }

            let definition = self.zmanim.get(&key);
            if let Some(definition) = definition {
                if !should_include(&definition.tags, &active_events) {
                    debug!(key = key.as_str(), "zman excluded by its tags");
                    excluded.push(key);
                    continue;
                }
            }

            let rounding = definition.map(|d| d.rounding).unwrap_or_default();
            let value = Evaluator::new(&context).evaluate_key(&key);
            results.push(ZmanResult::new(key, value, rounding));
        }

        info!(
            date = %request.date,
            evaluated = results.len(),
            excluded = excluded.len(),
            "batch complete"
        );

        BatchResponse {
            date: request.date,
            active_events,
            results,
            excluded,
        }
    }
}
