//! Expression evaluation

use super::functions;
use super::Evaluator;
use crate::error::ZmanimError;
use crate::semantic::*;
use crate::{Value, ZmanimResult};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Intermediate result of a sub-expression
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Time(DateTime<FixedOffset>),
    Duration(Duration),
    Number(Decimal),
    Season(Season),
}

impl Operand {
    fn describe(&self) -> &'static str {
        match self {
            Operand::Time(_) => "a time",
            Operand::Duration(_) => "a duration",
            Operand::Number(_) => "a number",
            Operand::Season(_) => "a season",
        }
    }
}

fn runtime_error(expr: &Expression, source: &Arc<str>, message: impl Into<String>) -> ZmanimError {
    ZmanimError::validation(message, expr.span.clone().unwrap_or_default(), source.clone())
}

fn arg<'e>(
    args: &'e [Expression],
    index: usize,
    call: &Expression,
    source: &Arc<str>,
) -> ZmanimResult<&'e Expression> {
    args.get(index)
        .ok_or_else(|| runtime_error(call, source, format!("missing argument {}", index + 1)))
}

impl<'c, 'a> Evaluator<'c, 'a> {
    pub(crate) fn eval(&mut self, expr: &Expression, source: &Arc<str>) -> ZmanimResult<Operand> {
        match &expr.kind {
            ExpressionKind::Number(n) => Ok(Operand::Number(*n)),
            ExpressionKind::Duration(magnitude, unit) => {
                let minutes = magnitude
                    .checked_mul(unit.minutes_per_unit())
                    .ok_or_else(|| functions::overflow("duration"))?;
                Ok(Operand::Duration(functions::minutes_to_duration(minutes)?))
            }
            ExpressionKind::ClockTime(time) => Ok(Operand::Time(self.context.local_time(*time)?)),
            ExpressionKind::Primitive(primitive) => {
                Ok(Operand::Time(self.context.primitive(*primitive)?))
            }
            ExpressionKind::Reference(key) => match self.evaluate_key(key).into_result()? {
                Value::Time(time) => Ok(Operand::Time(time)),
                Value::Duration(duration) => Ok(Operand::Duration(duration)),
                Value::Error(error) => Err(error),
            },
            ExpressionKind::FunctionCall { name, args } => self.call(expr, name, args, source),
            ExpressionKind::Arithmetic(left, op, right) => {
                let lhs = self.eval(left, source)?;
                let rhs = self.eval(right, source)?;
                apply_arithmetic(expr, source, lhs, *op, rhs)
            }
            ExpressionKind::Variable(variable) => self.variable(*variable),
            ExpressionKind::DateLiteral { day, month } => {
                let year = self.context.date().year();
                let date = NaiveDate::from_ymd_opt(year, *month, *day).ok_or_else(|| {
                    ZmanimError::Computation(format!("date {} does not exist in {}", expr, year))
                })?;
                Ok(Operand::Number(Decimal::from(date.ordinal())))
            }
            ExpressionKind::Season(season) => Ok(Operand::Season(*season)),
            ExpressionKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.test(condition, source)? {
                    self.eval(then, source)
                } else if let Some(otherwise) = otherwise {
                    self.eval(otherwise, source)
                } else {
                    Err(ZmanimError::Computation(format!(
                        "condition '{}' is false and the conditional has no else branch",
                        condition
                    )))
                }
            }
            ExpressionKind::Direction(_) | ExpressionKind::Base(_) => Err(runtime_error(
                expr,
                source,
                format!("'{}' is only meaningful as a function argument", expr),
            )),
        }
    }

    fn variable(&self, variable: Variable) -> ZmanimResult<Operand> {
        let location = self.context.location();
        let date = self.context.date();
        let degrees = |value: f64| {
            Decimal::from_f64(value).map(Operand::Number).ok_or_else(|| {
                ZmanimError::Computation(format!("{} = {} is not representable", variable, value))
            })
        };

        match variable {
            Variable::Latitude => degrees(location.latitude),
            Variable::Longitude => degrees(location.longitude),
            Variable::Elevation => degrees(location.elevation),
            Variable::DayLength => Ok(Operand::Duration(self.context.day_length_on(date)?)),
            Variable::Month => Ok(Operand::Number(Decimal::from(date.month()))),
            Variable::Day => Ok(Operand::Number(Decimal::from(date.day()))),
            Variable::DayOfYear | Variable::Date => {
                Ok(Operand::Number(Decimal::from(date.ordinal())))
            }
            Variable::Season => Ok(Operand::Season(Season::of(date.month(), location.latitude))),
        }
    }

    /// Evaluate a condition; `&&` and `||` short-circuit
    fn test(&mut self, condition: &Condition, source: &Arc<str>) -> ZmanimResult<bool> {
        match condition {
            Condition::And(left, right) => Ok(self.test(left, source)? && self.test(right, source)?),
            Condition::Or(left, right) => Ok(self.test(left, source)? || self.test(right, source)?),
            Condition::Not(inner) => Ok(!self.test(inner, source)?),
            Condition::Compare(left, op, right) => {
                let lhs = self.eval(left, source)?;
                let rhs = self.eval(right, source)?;
                let ordering = match (&lhs, &rhs) {
                    (Operand::Number(a), Operand::Number(b)) => a.cmp(b),
                    (Operand::Duration(a), Operand::Duration(b)) => a.cmp(b),
                    (Operand::Time(a), Operand::Time(b)) => a.cmp(b),
                    (Operand::Season(a), Operand::Season(b)) if op.is_equality() => {
                        return Ok((a == b) == (*op == ComparisonOperator::Equal));
                    }
                    _ => {
                        return Err(runtime_error(
                            left,
                            source,
                            format!(
                                "cannot compare {} with {} using '{}'",
                                lhs.describe(),
                                rhs.describe(),
                                op.symbol()
                            ),
                        ))
                    }
                };
                Ok(op.holds(ordering))
            }
        }
    }

    fn eval_time(
        &mut self,
        expr: &Expression,
        source: &Arc<str>,
    ) -> ZmanimResult<DateTime<FixedOffset>> {
        match self.eval(expr, source)? {
            Operand::Time(time) => Ok(time),
            other => Err(runtime_error(
                expr,
                source,
                format!("expected a time, found {}", other.describe()),
            )),
        }
    }

    fn eval_number(&mut self, expr: &Expression, source: &Arc<str>) -> ZmanimResult<Decimal> {
        match self.eval(expr, source)? {
            Operand::Number(n) => Ok(n),
            other => Err(runtime_error(
                expr,
                source,
                format!("expected a number, found {}", other.describe()),
            )),
        }
    }

    /// Evaluate a numeric argument and check it against the function's domain
    fn numeric_arg(
        &mut self,
        function: &str,
        expr: &Expression,
        source: &Arc<str>,
    ) -> ZmanimResult<Decimal> {
        let value = self.eval_number(expr, source)?;
        functions::check_numeric_domain(function, value).map_err(|violation| match violation
            .suggestion
        {
            Some(suggestion) => ZmanimError::validation_with_suggestion(
                violation.message,
                expr.span.clone().unwrap_or_default(),
                source.clone(),
                suggestion,
            ),
            None => runtime_error(expr, source, violation.message),
        })?;
        Ok(value)
    }

    fn direction_arg(
        &self,
        function: &str,
        expr: &Expression,
        source: &Arc<str>,
    ) -> ZmanimResult<Direction> {
        match &expr.kind {
            ExpressionKind::Direction(direction) => {
                functions::check_direction(function, *direction)
                    .map_err(|violation| runtime_error(expr, source, violation.message))?;
                Ok(*direction)
            }
            _ => Err(runtime_error(
                expr,
                source,
                format!("expected direction in {}()", function),
            )),
        }
    }

    /// Resolve an opinion base to its (start, end) day boundary
    fn base_bounds(
        &mut self,
        expr: &Expression,
        source: &Arc<str>,
    ) -> ZmanimResult<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        match &expr.kind {
            ExpressionKind::Base(OpinionBase::Named(base)) => {
                let (start, end) = base.boundaries();
                Ok((self.eval_boundary(start)?, self.eval_boundary(end)?))
            }
            ExpressionKind::Base(OpinionBase::Custom(start, end)) => {
                Ok((self.eval_time(start, source)?, self.eval_time(end, source)?))
            }
            _ => Err(runtime_error(expr, source, "expected an opinion base")),
        }
    }

    fn eval_boundary(&mut self, boundary_source: &str) -> ZmanimResult<DateTime<FixedOffset>> {
        let parsed = self.context.parsed(boundary_source)?;
        self.eval_time(&parsed.expression, &parsed.source)
    }

    /// The angle's offset from sunrise or sunset on the equinox, stretched or
    /// shrunk with the length of today's day
    fn seasonal_crossing(
        &self,
        degrees: f64,
        direction: Direction,
    ) -> ZmanimResult<DateTime<FixedOffset>> {
        let (side, geometric) = (direction.side(), direction.is_geometric());
        let equinox = self.context.march_equinox()?;
        let today = self.context.date();

        let edge = self.context.horizon_on(equinox, side, geometric)?;
        let crossing = self.context.crossing_on(equinox, degrees, side)?;
        let equinox_offset = match side {
            SolarSide::Morning => edge - crossing,
            SolarSide::Evening => crossing - edge,
        };
        let offset = functions::seasonal_offset(
            equinox_offset,
            self.context.day_length_on(equinox)?,
            self.context.day_length_on(today)?,
        )?;

        let anchor = self.context.horizon_on(today, side, geometric)?;
        match side {
            SolarSide::Morning => functions::shift(anchor, -offset),
            SolarSide::Evening => functions::shift(anchor, offset),
        }
    }

    fn call(
        &mut self,
        expr: &Expression,
        name: &str,
        args: &[Expression],
        source: &Arc<str>,
    ) -> ZmanimResult<Operand> {
        match name {
            "solar" => {
                let degrees = self.numeric_arg(name, arg(args, 0, expr, source)?, source)?;
                let direction = self.direction_arg(name, arg(args, 1, expr, source)?, source)?;
                let degrees = degrees.to_f64().ok_or_else(|| {
                    ZmanimError::Computation(format!("{} degrees is not representable", degrees))
                })?;
                let time = self
                    .context
                    .solar_angle_crossing(degrees, direction.side())?;
                Ok(Operand::Time(time))
            }
            "seasonal_solar" => {
                let degrees = self.numeric_arg(name, arg(args, 0, expr, source)?, source)?;
                let direction = self.direction_arg(name, arg(args, 1, expr, source)?, source)?;
                let degrees = degrees.to_f64().ok_or_else(|| {
                    ZmanimError::Computation(format!("{} degrees is not representable", degrees))
                })?;
                Ok(Operand::Time(self.seasonal_crossing(degrees, direction)?))
            }
            "proportional_hours" => {
                let hours = self.numeric_arg(name, arg(args, 0, expr, source)?, source)?;
                let (start, end) = self.base_bounds(arg(args, 1, expr, source)?, source)?;
                Ok(Operand::Time(functions::proportional_hours(
                    start, end, hours,
                )?))
            }
            "proportional_minutes" => {
                let minutes = self.numeric_arg(name, arg(args, 0, expr, source)?, source)?;
                let direction = self.direction_arg(name, arg(args, 1, expr, source)?, source)?;
                let sunrise = self.context.sunrise()?;
                let sunset = self.context.sunset()?;
                let anchor = match (direction.is_geometric(), direction.side()) {
                    (false, SolarSide::Morning) => sunrise,
                    (false, SolarSide::Evening) => sunset,
                    (true, SolarSide::Morning) => self.context.geometric_sunrise()?,
                    (true, SolarSide::Evening) => self.context.geometric_sunset()?,
                };
                Ok(Operand::Time(functions::proportional_minutes(
                    sunrise,
                    sunset,
                    anchor,
                    minutes,
                    direction.side(),
                )?))
            }
            "shaah_zmanis" => {
                let (start, end) = self.base_bounds(arg(args, 0, expr, source)?, source)?;
                Ok(Operand::Duration(functions::shaah_zmanis(start, end)?))
            }
            "midpoint" => {
                let first = self.eval_time(arg(args, 0, expr, source)?, source)?;
                let second = self.eval_time(arg(args, 1, expr, source)?, source)?;
                Ok(Operand::Time(functions::midpoint(first, second)?))
            }
            _ => Err(ZmanimError::unknown_function(
                name,
                expr.span.clone().unwrap_or_default(),
                source.clone(),
            )),
        }
    }
}

fn apply_arithmetic(
    expr: &Expression,
    source: &Arc<str>,
    lhs: Operand,
    op: ArithmeticOperation,
    rhs: Operand,
) -> ZmanimResult<Operand> {
    use ArithmeticOperation::*;

    let result = match (lhs, op, rhs) {
        (Operand::Time(t), Add, Operand::Duration(d))
        | (Operand::Duration(d), Add, Operand::Time(t)) => Operand::Time(functions::shift(t, d)?),
        (Operand::Time(t), Subtract, Operand::Duration(d)) => {
            Operand::Time(functions::shift(t, -d)?)
        }
        (Operand::Time(a), Subtract, Operand::Time(b)) => Operand::Duration(a - b),
        (Operand::Duration(a), Add, Operand::Duration(b)) => Operand::Duration(
            a.checked_add(&b)
                .ok_or_else(|| ZmanimError::Computation("duration is out of range".to_string()))?,
        ),
        (Operand::Duration(a), Subtract, Operand::Duration(b)) => Operand::Duration(
            a.checked_sub(&b)
                .ok_or_else(|| ZmanimError::Computation("duration is out of range".to_string()))?,
        ),
        (Operand::Duration(d), Multiply, Operand::Number(n))
        | (Operand::Number(n), Multiply, Operand::Duration(d)) => {
            Operand::Duration(functions::scale_duration(d, n)?)
        }
        (Operand::Duration(d), Divide, Operand::Number(n)) => {
            if n.is_zero() {
                return Err(ZmanimError::Computation("division by zero".to_string()));
            }
            let reciprocal = checked(Decimal::ONE.checked_div(n))?;
            Operand::Duration(functions::scale_duration(d, reciprocal)?)
        }
        (Operand::Number(a), Add, Operand::Number(b)) => {
            Operand::Number(checked(a.checked_add(b))?)
        }
        (Operand::Number(a), Subtract, Operand::Number(b)) => {
            Operand::Number(checked(a.checked_sub(b))?)
        }
        (Operand::Number(a), Multiply, Operand::Number(b)) => {
            Operand::Number(checked(a.checked_mul(b))?)
        }
        (Operand::Number(a), Divide, Operand::Number(b)) => {
            if b.is_zero() {
                return Err(ZmanimError::Computation("division by zero".to_string()));
            }
            Operand::Number(checked(a.checked_div(b))?)
        }
        (lhs, op, rhs) => {
            return Err(runtime_error(
                expr,
                source,
                format!(
                    "cannot apply '{}' to {} and {}",
                    op.symbol(),
                    lhs.describe(),
                    rhs.describe()
                ),
            ))
        }
    };
    Ok(result)
}

fn checked(value: Option<Decimal>) -> ZmanimResult<Decimal> {
    value.ok_or_else(|| ZmanimError::Computation("number is out of range".to_string()))
}
