//! Pre-evaluation validation
//!
//! Infers a static type for every node and rejects malformed formulas before
//! any astronomical call is made: unknown functions, wrong arity, wrong
//! argument kinds, out-of-domain literals and ill-typed arithmetic.

use crate::ast::Span;
use crate::error::ZmanimError;
use crate::evaluator::functions::{self, ArgKind, FunctionSignature};
use crate::semantic::*;
use crate::ZmanimResult;
use std::sync::Arc;

/// Static type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticType {
    Time,
    Duration,
    Number,
    Direction,
    Base,
    Season,
    /// A reference: resolves to a time or a duration
    Unknown,
}

impl StaticType {
    fn describe(&self) -> &'static str {
        match self {
            StaticType::Time => "a time",
            StaticType::Duration => "a duration",
            StaticType::Number => "a number",
            StaticType::Direction => "a direction",
            StaticType::Base => "an opinion base",
            StaticType::Season => "a season",
            StaticType::Unknown => "a zman reference",
        }
    }
}

/// A numeric argument outside its function's domain
#[derive(Debug, Clone, PartialEq)]
pub struct DomainViolation {
    pub message: String,
    pub suggestion: Option<&'static str>,
}

pub struct Validator {
    source: Arc<str>,
}

impl Validator {
    pub fn new(source: Arc<str>) -> Self {
        Self { source }
    }

    /// Validate a whole formula. The result must be a time or a duration.
    pub fn validate(&self, expr: &Expression) -> ZmanimResult<StaticType> {
        let ty = self.infer(expr)?;
        match ty {
            StaticType::Time | StaticType::Duration | StaticType::Unknown => Ok(ty),
            StaticType::Number => Err(self.error_with_suggestion(
                expr,
                "formula evaluates to a plain number",
                "add a unit, e.g. 72min",
            )),
            StaticType::Direction => Err(self.error_with_suggestion(
                expr,
                "a direction is only meaningful as a function argument",
                "Try: solar(16.1, before_sunrise)",
            )),
            StaticType::Base => Err(self.error_with_suggestion(
                expr,
                "an opinion base is only meaningful as a function argument",
                "Try: proportional_hours(3, gra) or shaah_zmanis(gra)",
            )),
            StaticType::Season => Err(self.error_with_suggestion(
                expr,
                "a season is only meaningful in a condition",
                "Try: if (season == \"summer\") { ... } else { ... }",
            )),
        }
    }

    fn span(expr: &Expression) -> Span {
        expr.span.clone().unwrap_or_default()
    }

    fn error(&self, expr: &Expression, message: impl Into<String>) -> ZmanimError {
        ZmanimError::validation(message, Self::span(expr), self.source.clone())
    }

    fn error_with_suggestion(
        &self,
        expr: &Expression,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> ZmanimError {
        ZmanimError::validation_with_suggestion(
            message,
            Self::span(expr),
            self.source.clone(),
            suggestion,
        )
    }

    fn domain_error(&self, expr: &Expression, violation: DomainViolation) -> ZmanimError {
        match violation.suggestion {
            Some(suggestion) => self.error_with_suggestion(expr, violation.message, suggestion),
            None => self.error(expr, violation.message),
        }
    }

    fn infer(&self, expr: &Expression) -> ZmanimResult<StaticType> {
        match &expr.kind {
            ExpressionKind::Number(_) => Ok(StaticType::Number),
            ExpressionKind::Duration(..) => Ok(StaticType::Duration),
            ExpressionKind::ClockTime(_) | ExpressionKind::Primitive(_) => Ok(StaticType::Time),
            ExpressionKind::Direction(_) => Ok(StaticType::Direction),
            ExpressionKind::Reference(_) => Ok(StaticType::Unknown),
            ExpressionKind::Base(OpinionBase::Named(_)) => Ok(StaticType::Base),
            ExpressionKind::Base(OpinionBase::Custom(start, end)) => {
                for (boundary, label) in [(start, "start"), (end, "end")] {
                    let ty = self.infer(boundary)?;
                    if !matches!(ty, StaticType::Time | StaticType::Unknown) {
                        return Err(self.error(
                            boundary,
                            format!("custom() {} must be a time, found {}", label, ty.describe()),
                        ));
                    }
                }
                Ok(StaticType::Base)
            }
            ExpressionKind::Variable(variable) => Ok(match variable {
                Variable::DayLength => StaticType::Duration,
                Variable::Season => StaticType::Season,
                _ => StaticType::Number,
            }),
            ExpressionKind::DateLiteral { .. } => Ok(StaticType::Number),
            ExpressionKind::Season(_) => Ok(StaticType::Season),
            ExpressionKind::Conditional {
                condition,
                then,
                otherwise,
            } => self.check_conditional(condition, then, otherwise.as_deref()),
            ExpressionKind::FunctionCall { name, args } => self.check_call(expr, name, args),
            ExpressionKind::Arithmetic(left, op, right) => {
                self.check_arithmetic(expr, left, *op, right)
            }
        }
    }

    fn check_conditional(
        &self,
        condition: &Condition,
        then: &Expression,
        otherwise: Option<&Expression>,
    ) -> ZmanimResult<StaticType> {
        self.check_condition(condition)?;
        let then_type = self.check_branch(then)?;
        let Some(otherwise) = otherwise else {
            return Ok(then_type);
        };
        let otherwise_type = self.check_branch(otherwise)?;

        match (then_type, otherwise_type) {
            (a, b) if a == b => Ok(a),
            (StaticType::Unknown, other) | (other, StaticType::Unknown) => Ok(other),
            (a, b) => Err(self.error(
                otherwise,
                format!(
                    "both branches of a conditional must have the same type, found {} and {}",
                    a.describe(),
                    b.describe()
                ),
            )),
        }
    }

    /// A conditional branch yields the formula's value: a time or a duration
    fn check_branch(&self, branch: &Expression) -> ZmanimResult<StaticType> {
        let ty = self.infer(branch)?;
        match ty {
            StaticType::Time | StaticType::Duration | StaticType::Unknown => Ok(ty),
            other => Err(self.error(
                branch,
                format!(
                    "a conditional branch must be a time or a duration, found {}",
                    other.describe()
                ),
            )),
        }
    }

    fn check_condition(&self, condition: &Condition) -> ZmanimResult<()> {
        use StaticType::*;

        match condition {
            Condition::And(left, right) | Condition::Or(left, right) => {
                self.check_condition(left)?;
                self.check_condition(right)
            }
            Condition::Not(inner) => self.check_condition(inner),
            Condition::Compare(left, op, right) => {
                let lt = self.infer(left)?;
                let rt = self.infer(right)?;
                let comparable = match (lt, rt) {
                    (Number, Number) | (Duration, Duration) | (Time, Time) => true,
                    (Unknown, Time | Duration | Unknown) | (Time | Duration, Unknown) => true,
                    (Season, Season) => {
                        if !op.is_equality() {
                            return Err(self.error_with_suggestion(
                                left,
                                format!("seasons cannot be compared with '{}'", op.symbol()),
                                "use == or !=",
                            ));
                        }
                        true
                    }
                    _ => false,
                };
                if comparable {
                    Ok(())
                } else {
                    Err(self.error(
                        left,
                        format!("cannot compare {} with {}", lt.describe(), rt.describe()),
                    ))
                }
            }
        }
    }

    fn check_call(
        &self,
        expr: &Expression,
        name: &str,
        args: &[Expression],
    ) -> ZmanimResult<StaticType> {
        let signature: &FunctionSignature = functions::signature(name).ok_or_else(|| {
            ZmanimError::unknown_function(name, Self::span(expr), self.source.clone())
        })?;

        if args.len() != signature.params.len() {
            return Err(self.error_with_suggestion(
                expr,
                format!(
                    "{}() takes {} argument(s), found {}",
                    name,
                    signature.params.len(),
                    args.len()
                ),
                format!("Usage: {}", signature.usage),
            ));
        }

        for (position, (arg, kind)) in args.iter().zip(signature.params).enumerate() {
            let ty = self.infer(arg)?;
            match kind {
                ArgKind::Number => {
                    if ty != StaticType::Number {
                        return Err(self.error_with_suggestion(
                            arg,
                            format!(
                                "expected a number as argument {} of {}(), found {}",
                                position + 1,
                                name,
                                ty.describe()
                            ),
                            format!("Usage: {}", signature.usage),
                        ));
                    }
                    if let ExpressionKind::Number(value) = &arg.kind {
                        functions::check_numeric_domain(name, *value)
                            .map_err(|violation| self.domain_error(arg, violation))?;
                    }
                }
                ArgKind::Direction => match &arg.kind {
                    ExpressionKind::Direction(direction) => {
                        functions::check_direction(name, *direction)
                            .map_err(|violation| self.domain_error(arg, violation))?;
                    }
                    _ => {
                        return Err(self.error_with_suggestion(
                            arg,
                            format!(
                                "expected direction after ',' in {}(), found {}",
                                name,
                                ty.describe()
                            ),
                            "use before_sunrise or after_sunset",
                        ))
                    }
                },
                ArgKind::Base => {
                    if ty != StaticType::Base {
                        return Err(self.error_with_suggestion(
                            arg,
                            format!(
                                "expected an opinion base in {}(), found {}",
                                name,
                                ty.describe()
                            ),
                            "use a named base such as gra or mga, or custom(start, end)",
                        ));
                    }
                }
                ArgKind::Time => {
                    if !matches!(ty, StaticType::Time | StaticType::Unknown) {
                        return Err(self.error(
                            arg,
                            format!(
                                "expected a time as argument {} of {}(), found {}",
                                position + 1,
                                name,
                                ty.describe()
                            ),
                        ));
                    }
                }
            }
        }

        Ok(signature.returns)
    }

    fn check_arithmetic(
        &self,
        expr: &Expression,
        left: &Expression,
        op: ArithmeticOperation,
        right: &Expression,
    ) -> ZmanimResult<StaticType> {
        use StaticType::*;

        let lt = self.infer(left)?;
        let rt = self.infer(right)?;

        for (operand, ty) in [(left, lt), (right, rt)] {
            if matches!(ty, Direction | Base | Season) {
                return Err(self.error(
                    operand,
                    format!("{} cannot be used in arithmetic", ty.describe()),
                ));
            }
        }

        if op == ArithmeticOperation::Divide {
            if let ExpressionKind::Number(n) = &right.kind {
                if n.is_zero() {
                    return Err(self.error(right, "division by zero"));
                }
            }
        }

        let result = match (op, lt, rt) {
            (_, Number, Number) => Some(Number),

            (ArithmeticOperation::Add, Time, Duration)
            | (ArithmeticOperation::Add, Duration, Time)
            | (ArithmeticOperation::Add, Time, Unknown)
            | (ArithmeticOperation::Add, Unknown, Time) => Some(Time),
            (ArithmeticOperation::Add, Duration, Duration) => Some(Duration),
            (ArithmeticOperation::Add, Unknown, Duration)
            | (ArithmeticOperation::Add, Duration, Unknown)
            | (ArithmeticOperation::Add, Unknown, Unknown) => Some(Unknown),
            (ArithmeticOperation::Add, Time, Time) => {
                return Err(self.error_with_suggestion(
                    expr,
                    "cannot add two times",
                    "Try: time2 - time1",
                ))
            }

            (ArithmeticOperation::Subtract, Time, Duration) => Some(Time),
            (ArithmeticOperation::Subtract, Time, Time)
            | (ArithmeticOperation::Subtract, Unknown, Time)
            | (ArithmeticOperation::Subtract, Duration, Duration)
            | (ArithmeticOperation::Subtract, Duration, Unknown) => Some(Duration),
            (ArithmeticOperation::Subtract, Time, Unknown)
            | (ArithmeticOperation::Subtract, Unknown, Duration)
            | (ArithmeticOperation::Subtract, Unknown, Unknown) => Some(Unknown),
            (ArithmeticOperation::Subtract, Duration, Time) => {
                return Err(self.error_with_suggestion(
                    expr,
                    "cannot subtract a time from a duration",
                    "Try: time - duration",
                ))
            }

            (ArithmeticOperation::Multiply, Duration | Unknown, Number)
            | (ArithmeticOperation::Multiply, Number, Duration | Unknown)
            | (ArithmeticOperation::Divide, Duration | Unknown, Number) => Some(Duration),

            _ => None,
        };

        match result {
            Some(ty) => Ok(ty),
            None => Err(self.arithmetic_error(expr, left, op, right, lt, rt)),
        }
    }

    fn arithmetic_error(
        &self,
        expr: &Expression,
        left: &Expression,
        op: ArithmeticOperation,
        right: &Expression,
        lt: StaticType,
        rt: StaticType,
    ) -> ZmanimError {
        use StaticType::*;

        match op {
            ArithmeticOperation::Add | ArithmeticOperation::Subtract => {
                let number = if lt == Number { left } else { right };
                let other = if lt == Number { rt } else { lt };
                let verb = if op == ArithmeticOperation::Add {
                    "add"
                } else {
                    "subtract"
                };
                let suggestion = match &number.kind {
                    ExpressionKind::Number(n) => format!("did you mean {}min?", n.normalize()),
                    _ => "add a unit such as min or hr".to_string(),
                };
                self.error_with_suggestion(
                    expr,
                    format!("cannot {} a plain number and {}", verb, other.describe()),
                    suggestion,
                )
            }
            ArithmeticOperation::Multiply | ArithmeticOperation::Divide => {
                let verb = if op == ArithmeticOperation::Multiply {
                    "multiply"
                } else {
                    "divide"
                };
                if lt == Time || rt == Time {
                    self.error_with_suggestion(
                        expr,
                        format!("cannot {} a time", verb),
                        "only durations can be scaled, e.g. 2 * 30min",
                    )
                } else {
                    self.error(
                        expr,
                        format!("cannot {} {} by {}", verb, lt.describe(), rt.describe()),
                    )
                }
            }
        }
    }
}

/// Validate an already parsed formula against its source text
pub fn validate(expr: &Expression, source: &Arc<str>) -> ZmanimResult<StaticType> {
    Validator::new(source.clone()).validate(expr)
}
