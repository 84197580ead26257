//! Formula evaluation and dependency resolution
//!
//! Evaluates a zman by key:
//! 1. Return the memoized value if the run already computed it
//! 2. Report a cycle if the key is already on the current reference path
//! 3. Otherwise look up, parse and validate its formula, evaluate it,
//!    memoize the result and return it
//!
//! The dependency graph is never built up front; it is discovered
//! depth-first while evaluating, so only the requested subtrees are visited.

pub mod context;
pub mod expression;
pub mod functions;
pub mod timeout;

pub use context::{ExecutionContext, FormulaRegistry, ParsedFormula};

use crate::error::ZmanimError;
use crate::Value;
use expression::Operand;
use tracing::{trace, warn};

/// Evaluate the formula registered under `key`
pub fn evaluate(key: &str, context: &ExecutionContext) -> Value {
    Evaluator::new(context).evaluate_key(key)
}

/// Evaluate ad-hoc formula text against a context; `@references` resolve through its registry
pub fn evaluate_formula(source: &str, context: &ExecutionContext) -> Value {
    Evaluator::new(context).evaluate_source(source)
}

/// State of a key within one run
#[derive(Debug, Clone, PartialEq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Done(Value),
}

/// Depth-first evaluator for one top-level request
///
/// The path holds the keys currently being evaluated; it is what makes a key
/// "in progress". Several evaluators may share one context from different threads.
pub struct Evaluator<'c, 'a> {
    context: &'c ExecutionContext<'a>,
    path: Vec<String>,
}

impl<'c, 'a> Evaluator<'c, 'a> {
    pub fn new(context: &'c ExecutionContext<'a>) -> Self {
        Self {
            context,
            path: Vec::new(),
        }
    }

    pub fn context(&self) -> &'c ExecutionContext<'a> {
        self.context
    }

    pub fn visit_state(&self, key: &str) -> VisitState {
        if let Some(value) = self.context.memoized(key) {
            VisitState::Done(value)
        } else if self.path.iter().any(|k| k == key) {
            VisitState::InProgress
        } else {
            VisitState::Unvisited
        }
    }

    pub fn evaluate_key(&mut self, key: &str) -> Value {
        match self.visit_state(key) {
            VisitState::Done(value) => return value,
            VisitState::InProgress => {
                let start = self.path.iter().position(|k| k == key).unwrap_or(0);
                let mut chain: Vec<String> = self.path[start..].to_vec();
                chain.push(key.to_string());
                return Value::Error(ZmanimError::Cycle { chain });
            }
            VisitState::Unvisited => {}
        }

        let limits = self.context.limits();
        if self.path.len() >= limits.max_reference_depth {
            return Value::Error(ZmanimError::ResourceLimitExceeded {
                limit_name: "max_reference_depth".to_string(),
                limit_value: limits.max_reference_depth.to_string(),
                actual_value: (self.path.len() + 1).to_string(),
                suggestion: format!("Shorten the @reference chain leading to '{}'", key),
            });
        }
        if let Err(error) = self.context.check_timeout() {
            return Value::Error(error);
        }

        let Some(source) = self.context.lookup(key) else {
            return self.context.memoize(
                key,
                Value::Error(ZmanimError::Reference {
                    key: key.to_string(),
                }),
            );
        };

        trace!(key, formula = source, "evaluating zman");
        self.path.push(key.to_string());
        let value = self.evaluate_source(source);
        self.path.pop();

        if let Value::Error(error) = &value {
            warn!(key, error = %error, "zman evaluation failed");
            // Depends on the path this key was reached by, not on the key itself
            if matches!(error, ZmanimError::ResourceLimitExceeded { .. }) {
                return value;
            }
        }
        self.context.memoize(key, value)
    }

    /// Parse, validate and evaluate formula text
    pub fn evaluate_source(&mut self, source: &str) -> Value {
        let parsed = match self.context.parsed(source) {
            Ok(parsed) => parsed,
            Err(error) => return Value::Error(error),
        };

        match self.eval(&parsed.expression, &parsed.source) {
            Ok(Operand::Time(time)) => Value::Time(time),
            Ok(Operand::Duration(duration)) => Value::Duration(duration),
            Ok(Operand::Number(_)) => Value::Error(ZmanimError::validation(
                "formula evaluates to a plain number",
                parsed.expression.span.clone().unwrap_or_default(),
                parsed.source.clone(),
            )),
            Ok(Operand::Season(_)) => Value::Error(ZmanimError::validation(
                "formula evaluates to a season",
                parsed.expression.span.clone().unwrap_or_default(),
                parsed.source.clone(),
            )),
            Err(error) => Value::Error(error),
        }
    }
}
