use crate::ast::{DepthTracker, Span};
use crate::error::ZmanimError;
use crate::resource_limits::ResourceLimits;
use crate::semantic::Expression;
use pest::Parser;
use pest_derive::Parser;
use std::sync::Arc;

pub mod expressions;
pub mod literals;

#[derive(Parser)]
#[grammar = "src/parser/zmanim.pest"]
pub struct ZmanimParser;

/// Parse formula source text with default resource limits
pub fn parse(source: &str) -> Result<Expression, ZmanimError> {
    parse_with_limits(source, &ResourceLimits::default())
}

pub fn parse_with_limits(source: &str, limits: &ResourceLimits) -> Result<Expression, ZmanimError> {
    if source.len() > limits.max_formula_bytes {
        return Err(ZmanimError::ResourceLimitExceeded {
            limit_name: "max_formula_bytes".to_string(),
            limit_value: format!("{} bytes", limits.max_formula_bytes),
            actual_value: format!("{} bytes", source.len()),
            suggestion: "Split the formula into smaller zmanim joined with @references".to_string(),
        });
    }

    // The pest parser recurses once per parenthesis or brace, so reject deep nesting up front.
    let nesting = max_paren_depth(source);
    if nesting > limits.max_expression_depth {
        return Err(depth_exceeded(limits.max_expression_depth, nesting));
    }

    let source_text: Arc<str> = Arc::from(source);

    let mut pairs = ZmanimParser::parse(Rule::formula, source)
        .map_err(|e| convert_pest_error(e, source_text.clone()))?;

    let formula = pairs
        .next()
        .ok_or_else(|| ZmanimError::Engine("Empty parse result".to_string()))?;
    let expression = formula
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::expression)
        .ok_or_else(|| ZmanimError::Engine("Formula without expression".to_string()))?;

    let mut depth = DepthTracker::with_max_depth(limits.max_expression_depth);
    expressions::parse_expression(expression, &source_text, &mut depth)
}

pub(crate) fn depth_exceeded(limit: usize, actual: usize) -> ZmanimError {
    ZmanimError::ResourceLimitExceeded {
        limit_name: "max_expression_depth".to_string(),
        limit_value: limit.to_string(),
        actual_value: actual.to_string(),
        suggestion: "Simplify nested expressions to reduce depth".to_string(),
    }
}

fn max_paren_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for c in source.chars() {
        match c {
            '(' | '{' => {
                depth += 1;
                max = max.max(depth);
            }
            ')' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn convert_pest_error(error: pest::error::Error<Rule>, source_text: Arc<str>) -> ZmanimError {
    let error = error.renamed_rules(|rule| {
        match rule {
            Rule::expression | Rule::term => "expression",
            Rule::add_plus => "'+'",
            Rule::add_minus => "'-'",
            Rule::mul_star => "'*'",
            Rule::mul_slash => "'/'",
            Rule::call => "function call",
            Rule::reference => "@reference",
            Rule::clock_time => "clock time (HH:MM)",
            Rule::duration_literal => "duration (e.g. 72min)",
            Rule::duration_unit => "unit (min, hr, days)",
            Rule::number_literal | Rule::decimal => "number",
            Rule::identifier => "identifier",
            Rule::conditional => "if (condition) { ... }",
            Rule::condition | Rule::condition_and | Rule::negation | Rule::comparison => {
                "condition"
            }
            Rule::cmp_gt | Rule::cmp_lt | Rule::cmp_ge | Rule::cmp_le | Rule::cmp_eq
            | Rule::cmp_ne => "comparison operator",
            Rule::date_literal | Rule::day_of_month | Rule::month_name => "date (e.g. 21-May)",
            Rule::season_literal | Rule::season_name => "season (e.g. \"summer\")",
            Rule::formula => "formula",
            Rule::EOI => "end of formula",
            other => return format!("{:?}", other),
        }
        .to_string()
    });

    let (start, end) = match error.location {
        pest::error::InputLocation::Pos(pos) => (pos, pos),
        pest::error::InputLocation::Span((start, end)) => (start, end),
    };
    let (line, col) = match error.line_col {
        pest::error::LineColLocation::Pos((line, col)) => (line, col),
        pest::error::LineColLocation::Span((line, col), _) => (line, col),
    };

    ZmanimError::parse(
        error.variant.message().to_string(),
        Span {
            start,
            end,
            line,
            col,
        },
        source_text,
    )
}
