use crate::ast::{DepthTracker, Span};
use crate::error::ZmanimError;
use crate::parser::literals::{
    parse_clock_time, parse_date_literal, parse_duration_literal, parse_number_literal,
    parse_season_literal,
};
use crate::parser::{depth_exceeded, Rule};
use crate::semantic::*;
use pest::iterators::Pair;
use std::sync::Arc;

// Helper to create an Expression carrying its source span
fn traceable_expr(kind: ExpressionKind, pair: &Pair<Rule>) -> Expression {
    Expression::new(kind, Some(Span::from_pest_span(pair.as_span())))
}

pub(crate) fn parse_expression(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Expression, ZmanimError> {
    if let Err(reached) = depth.push_depth() {
        return Err(depth_exceeded(depth.max_depth(), reached));
    }

    let result = parse_additive(pair, source, depth);
    depth.pop_depth();
    result
}

fn parse_additive(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Expression, ZmanimError> {
    let mut pairs = pair.clone().into_inner();
    let mut left = parse_term(
        pairs.next().ok_or_else(|| {
            ZmanimError::Engine("Missing left term in arithmetic expression".to_string())
        })?,
        source,
        depth,
    )?;

    while let Some(op_pair) = pairs.next() {
        let operation = match op_pair.as_rule() {
            Rule::add_plus => ArithmeticOperation::Add,
            Rule::add_minus => ArithmeticOperation::Subtract,
            _ => {
                return Err(ZmanimError::Engine(format!(
                    "Unexpected operator in arithmetic expression: {:?}",
                    op_pair.as_rule()
                )))
            }
        };

        let right = parse_term(
            pairs.next().ok_or_else(|| {
                ZmanimError::Engine("Missing right term in arithmetic expression".to_string())
            })?,
            source,
            depth,
        )?;

        let kind = ExpressionKind::Arithmetic(Box::new(left), operation, Box::new(right));
        left = traceable_expr(kind, &pair);
    }

    Ok(left)
}

fn parse_term(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Expression, ZmanimError> {
    let mut pairs = pair.clone().into_inner();
    let mut left = parse_factor(
        pairs
            .next()
            .ok_or_else(|| ZmanimError::Engine("Missing left factor in term".to_string()))?,
        source,
        depth,
    )?;

    while let Some(op_pair) = pairs.next() {
        let operation = match op_pair.as_rule() {
            Rule::mul_star => ArithmeticOperation::Multiply,
            Rule::mul_slash => ArithmeticOperation::Divide,
            _ => {
                return Err(ZmanimError::Engine(format!(
                    "Unexpected operator in term: {:?}",
                    op_pair.as_rule()
                )))
            }
        };

        let right = parse_factor(
            pairs
                .next()
                .ok_or_else(|| ZmanimError::Engine("Missing right factor in term".to_string()))?,
            source,
            depth,
        )?;

        let kind = ExpressionKind::Arithmetic(Box::new(left), operation, Box::new(right));
        left = traceable_expr(kind, &pair);
    }

    Ok(left)
}

fn parse_factor(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Expression, ZmanimError> {
    match pair.as_rule() {
        Rule::clock_time => {
            let time = parse_clock_time(&pair, source)?;
            Ok(traceable_expr(ExpressionKind::ClockTime(time), &pair))
        }
        Rule::duration_literal => {
            let (magnitude, unit) = parse_duration_literal(&pair, source)?;
            Ok(traceable_expr(
                ExpressionKind::Duration(magnitude, unit),
                &pair,
            ))
        }
        Rule::number_literal => {
            let number = parse_number_literal(&pair, source)?;
            Ok(traceable_expr(ExpressionKind::Number(number), &pair))
        }
        Rule::reference => {
            let key = pair
                .clone()
                .into_inner()
                .next()
                .map(|ident| ident.as_str().to_string())
                .ok_or_else(|| ZmanimError::Engine("Reference without key".to_string()))?;
            Ok(traceable_expr(ExpressionKind::Reference(key), &pair))
        }
        Rule::call => parse_call(pair, source, depth),
        Rule::conditional => parse_conditional(pair, source, depth),
        Rule::date_literal => {
            let (day, month) = parse_date_literal(&pair, source)?;
            Ok(traceable_expr(ExpressionKind::DateLiteral { day, month }, &pair))
        }
        Rule::season_literal => {
            let season = parse_season_literal(&pair, source)?;
            Ok(traceable_expr(ExpressionKind::Season(season), &pair))
        }
        Rule::identifier => parse_identifier(&pair, source),
        Rule::expression => parse_expression(pair, source, depth),
        other => Err(ZmanimError::Engine(format!(
            "Unexpected rule in factor: {:?}",
            other
        ))),
    }
}

/// Classify a bare identifier as a primitive, direction, named opinion base or variable
fn parse_identifier(pair: &Pair<Rule>, source: &Arc<str>) -> Result<Expression, ZmanimError> {
    let ident = pair.as_str();

    let kind = if let Some(primitive) = Primitive::from_identifier(ident) {
        ExpressionKind::Primitive(primitive)
    } else if let Some(direction) = Direction::from_identifier(ident) {
        ExpressionKind::Direction(direction)
    } else if let Some(base) = NamedBase::from_identifier(ident) {
        ExpressionKind::Base(OpinionBase::Named(base))
    } else if let Some(variable) = Variable::from_identifier(ident) {
        ExpressionKind::Variable(variable)
    } else {
        return Err(ZmanimError::parse_with_suggestion(
            format!("unknown identifier '{}'", ident),
            Span::from_pest_span(pair.as_span()),
            source.clone(),
            format!("to reference another zman write '@{}'", ident),
        ));
    };

    Ok(traceable_expr(kind, pair))
}

fn parse_call(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Expression, ZmanimError> {
    let mut inner = pair.clone().into_inner();
    let name = inner
        .next()
        .map(|ident| ident.as_str().to_string())
        .ok_or_else(|| ZmanimError::Engine("Function call without name".to_string()))?;

    let mut args = Vec::new();
    for arg in inner {
        args.push(parse_expression(arg, source, depth)?);
    }

    if name == "custom" {
        if args.len() != 2 {
            return Err(ZmanimError::parse(
                format!("custom() takes a start and an end, found {} argument(s)", args.len()),
                Span::from_pest_span(pair.as_span()),
                source.clone(),
            ));
        }
        let end = args.pop();
        let start = args.pop();
        if let (Some(start), Some(end)) = (start, end) {
            let base = OpinionBase::Custom(Box::new(start), Box::new(end));
            return Ok(traceable_expr(ExpressionKind::Base(base), &pair));
        }
    }

    Ok(traceable_expr(
        ExpressionKind::FunctionCall { name, args },
        &pair,
    ))
}

fn parse_conditional(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Expression, ZmanimError> {
    let mut inner = pair.clone().into_inner();
    let missing = |part: &str| ZmanimError::Engine(format!("Conditional without {}", part));

    let condition = inner.next().ok_or_else(|| missing("condition"))?;
    let condition = parse_condition(condition, source, depth)?;
    let then = inner.next().ok_or_else(|| missing("branch"))?;
    let then = parse_factor(then, source, depth)?;
    let otherwise = match inner.next() {
        Some(branch) => Some(Box::new(parse_factor(branch, source, depth)?)),
        None => None,
    };

    Ok(traceable_expr(
        ExpressionKind::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise,
        },
        &pair,
    ))
}

/// `||` of `&&` chains, both left-associative
fn parse_condition(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Condition, ZmanimError> {
    if let Err(reached) = depth.push_depth() {
        return Err(depth_exceeded(depth.max_depth(), reached));
    }

    let result = match pair.as_rule() {
        Rule::condition | Rule::condition_and => {
            let is_or = pair.as_rule() == Rule::condition;
            let mut operands = pair.into_inner();
            let first = operands
                .next()
                .ok_or_else(|| ZmanimError::Engine("Empty condition".to_string()))?;
            let mut left = parse_condition(first, source, depth)?;
            for operand in operands {
                let right = Box::new(parse_condition(operand, source, depth)?);
                left = if is_or {
                    Condition::Or(Box::new(left), right)
                } else {
                    Condition::And(Box::new(left), right)
                };
            }
            Ok(left)
        }
        Rule::negation => {
            let operand = pair
                .into_inner()
                .next()
                .ok_or_else(|| ZmanimError::Engine("Negation without operand".to_string()))?;
            Ok(Condition::Not(Box::new(parse_condition(operand, source, depth)?)))
        }
        Rule::comparison => parse_comparison(pair, source, depth),
        other => Err(ZmanimError::Engine(format!(
            "Unexpected rule in condition: {:?}",
            other
        ))),
    };

    depth.pop_depth();
    result
}

fn parse_comparison(
    pair: Pair<Rule>,
    source: &Arc<str>,
    depth: &mut DepthTracker,
) -> Result<Condition, ZmanimError> {
    let mut inner = pair.into_inner();
    let (Some(left), Some(op), Some(right)) = (inner.next(), inner.next(), inner.next()) else {
        return Err(ZmanimError::Engine("Incomplete comparison".to_string()));
    };

    let op = match op.as_rule() {
        Rule::cmp_gt => ComparisonOperator::Greater,
        Rule::cmp_lt => ComparisonOperator::Less,
        Rule::cmp_ge => ComparisonOperator::GreaterOrEqual,
        Rule::cmp_le => ComparisonOperator::LessOrEqual,
        Rule::cmp_eq => ComparisonOperator::Equal,
        Rule::cmp_ne => ComparisonOperator::NotEqual,
        other => {
            return Err(ZmanimError::Engine(format!(
                "Unexpected comparison operator: {:?}",
                other
            )))
        }
    };

    Ok(Condition::Compare(
        parse_factor(left, source, depth)?,
        op,
        parse_factor(right, source, depth)?,
    ))
}
