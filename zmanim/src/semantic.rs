//! Formula syntax tree
//!
//! Expressions are immutable once built. Structural equality ignores spans,
//! so re-parsing the same text always yields an equal tree.

use crate::ast::Span;
use chrono::{NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed formula node with its source location
#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Option<Span>,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Option<Span>) -> Self {
        Self { kind, span }
    }

    /// Build an expression without a source location
    pub fn bare(kind: ExpressionKind) -> Self {
        Self { kind, span: None }
    }

    /// Collect every `@key` referenced anywhere in the tree, in source order
    pub fn references(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_references(&mut keys);
        keys
    }

    fn collect_references<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match &self.kind {
            ExpressionKind::Reference(key) => keys.push(key),
            ExpressionKind::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_references(keys);
                }
            }
            ExpressionKind::Arithmetic(left, _, right) => {
                left.collect_references(keys);
                right.collect_references(keys);
            }
            ExpressionKind::Base(OpinionBase::Custom(start, end)) => {
                start.collect_references(keys);
                end.collect_references(keys);
            }
            ExpressionKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                condition.collect_references(keys);
                then.collect_references(keys);
                if let Some(otherwise) = otherwise {
                    otherwise.collect_references(keys);
                }
            }
            _ => {}
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Number(Decimal),
    Duration(Decimal, DurationUnit),
    ClockTime(NaiveTime),
    Primitive(Primitive),
    Direction(Direction),
    Base(OpinionBase),
    FunctionCall { name: String, args: Vec<Expression> },
    Arithmetic(Box<Expression>, ArithmeticOperation, Box<Expression>),
    Reference(String),
    Variable(Variable),
    /// `29-Feb`: the day of the year of that date in the evaluated year
    DateLiteral { day: u32, month: u32 },
    Season(Season),
    Conditional {
        condition: Box<Condition>,
        then: Box<Expression>,
        otherwise: Option<Box<Expression>>,
    },
}

/// Boolean test guarding a conditional formula
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(Expression, ComparisonOperator, Expression),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    fn collect_references<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Condition::Compare(left, _, right) => {
                left.collect_references(keys);
                right.collect_references(keys);
            }
            Condition::And(left, right) | Condition::Or(left, right) => {
                left.collect_references(keys);
                right.collect_references(keys);
            }
            Condition::Not(inner) => inner.collect_references(keys),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Condition::Or(..) => 1,
            Condition::And(..) => 2,
            Condition::Compare(..) | Condition::Not(_) => 3,
        }
    }

    /// First comparison in the tree, for error locations
    pub fn first_operand(&self) -> &Expression {
        match self {
            Condition::Compare(left, _, _) => left,
            Condition::And(left, _) | Condition::Or(left, _) => left.first_operand(),
            Condition::Not(inner) => inner.first_operand(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
    NotEqual,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Greater => ">",
            ComparisonOperator::Less => "<",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonOperator::Equal | ComparisonOperator::NotEqual)
    }

    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOperator::Greater => ordering == Greater,
            ComparisonOperator::Less => ordering == Less,
            ComparisonOperator::GreaterOrEqual => ordering != Less,
            ComparisonOperator::LessOrEqual => ordering != Greater,
            ComparisonOperator::Equal => ordering == Equal,
            ComparisonOperator::NotEqual => ordering != Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    pub fn minutes_per_unit(&self) -> Decimal {
        match self {
            DurationUnit::Minutes => Decimal::ONE,
            DurationUnit::Hours => Decimal::from(60),
            DurationUnit::Days => Decimal::from(1440),
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "m" | "min" | "mins" | "minute" | "minutes" => Some(DurationUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(DurationUnit::Hours),
            "d" | "day" | "days" => Some(DurationUnit::Days),
            _ => None,
        }
    }

    pub fn canonical_suffix(&self) -> &'static str {
        match self {
            DurationUnit::Minutes => "min",
            DurationUnit::Hours => "hr",
            DurationUnit::Days => "days",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperation {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperation::Add => "+",
            ArithmeticOperation::Subtract => "-",
            ArithmeticOperation::Multiply => "*",
            ArithmeticOperation::Divide => "/",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            ArithmeticOperation::Add | ArithmeticOperation::Subtract => 1,
            ArithmeticOperation::Multiply | ArithmeticOperation::Divide => 2,
        }
    }
}

/// Which half of the day a solar event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarSide {
    Morning,
    Evening,
}

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_identifier(ident: &str) -> Option<Self> {
                match ident {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum! {
    /// Astronomical anchors usable as bare identifiers
    Primitive {
        Sunrise => "sunrise",
        Sunset => "sunset",
        SolarNoon => "solar_noon",
        SolarMidnight => "solar_midnight",
        VisibleSunrise => "visible_sunrise",
        VisibleSunset => "visible_sunset",
        GeometricSunrise => "geometric_sunrise",
        GeometricSunset => "geometric_sunset",
        CivilDawn => "civil_dawn",
        CivilDusk => "civil_dusk",
        NauticalDawn => "nautical_dawn",
        NauticalDusk => "nautical_dusk",
        AstronomicalDawn => "astronomical_dawn",
        AstronomicalDusk => "astronomical_dusk",
        Molad => "molad",
    }
}

keyword_enum! {
    /// Facts about the evaluated date and place, usable in conditions
    Variable {
        Latitude => "latitude",
        Longitude => "longitude",
        Elevation => "elevation",
        DayLength => "day_length",
        Month => "month",
        Day => "day",
        DayOfYear => "day_of_year",
        Date => "date",
        Season => "season",
    }
}

keyword_enum! {
    /// Astronomical season at the evaluated place, by month and hemisphere
    Season {
        Spring => "spring",
        Summer => "summer",
        Autumn => "autumn",
        Winter => "winter",
    }
}

impl Season {
    pub fn of(month: u32, latitude: f64) -> Self {
        let northern = match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        };
        if latitude >= 0.0 {
            return northern;
        }
        match northern {
            Season::Spring => Season::Autumn,
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
            Season::Winter => Season::Summer,
        }
    }
}

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Three-letter English name of a 1-based month
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// 1-based month of a three-letter English name
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .and_then(|index| u32::try_from(index + 1).ok())
}

keyword_enum! {
    /// Side-of-day selector for `solar` and `proportional_minutes`
    Direction {
        BeforeSunrise => "before_sunrise",
        AfterSunrise => "after_sunrise",
        BeforeVisibleSunrise => "before_visible_sunrise",
        AfterVisibleSunrise => "after_visible_sunrise",
        BeforeGeometricSunrise => "before_geometric_sunrise",
        AfterGeometricSunrise => "after_geometric_sunrise",
        BeforeSunset => "before_sunset",
        AfterSunset => "after_sunset",
        BeforeVisibleSunset => "before_visible_sunset",
        AfterVisibleSunset => "after_visible_sunset",
        BeforeGeometricSunset => "before_geometric_sunset",
        AfterGeometricSunset => "after_geometric_sunset",
        BeforeNoon => "before_noon",
        AfterNoon => "after_noon",
    }
}

impl Direction {
    /// Degrees are always measured below the horizon, so every sunrise-anchored
    /// direction selects the dawn crossing and every sunset-anchored one the dusk crossing.
    pub fn side(&self) -> SolarSide {
        match self {
            Direction::BeforeSunrise
            | Direction::AfterSunrise
            | Direction::BeforeVisibleSunrise
            | Direction::AfterVisibleSunrise
            | Direction::BeforeGeometricSunrise
            | Direction::AfterGeometricSunrise
            | Direction::BeforeNoon => SolarSide::Morning,
            Direction::BeforeSunset
            | Direction::AfterSunset
            | Direction::BeforeVisibleSunset
            | Direction::AfterVisibleSunset
            | Direction::BeforeGeometricSunset
            | Direction::AfterGeometricSunset
            | Direction::AfterNoon => SolarSide::Evening,
        }
    }

    /// Directions accepted by `proportional_minutes`
    pub fn is_day_edge_offset(&self) -> bool {
        matches!(
            self,
            Direction::BeforeSunrise
                | Direction::BeforeVisibleSunrise
                | Direction::BeforeGeometricSunrise
                | Direction::AfterSunset
                | Direction::AfterVisibleSunset
                | Direction::AfterGeometricSunset
        )
    }

    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            Direction::BeforeGeometricSunrise
                | Direction::AfterGeometricSunrise
                | Direction::BeforeGeometricSunset
                | Direction::AfterGeometricSunset
        )
    }
}

keyword_enum! {
    /// Named halachic day-boundary conventions
    NamedBase {
        Gra => "gra",
        Mga => "mga",
        Mga60 => "mga_60",
        Mga72 => "mga_72",
        Mga90 => "mga_90",
        Mga96 => "mga_96",
        Mga120 => "mga_120",
        Mga72Zmanis => "mga_72_zmanis",
        Mga90Zmanis => "mga_90_zmanis",
        Mga96Zmanis => "mga_96_zmanis",
        Mga16Point1 => "mga_16_1",
        Mga18 => "mga_18",
        Mga19Point8 => "mga_19_8",
        Mga26 => "mga_26",
        BaalHatanya => "baal_hatanya",
        AteretTorah => "ateret_torah",
    }
}

/// Day boundary formulas for each named base, as (start, end) source text
const BASE_BOUNDARIES: &[(NamedBase, &str, &str)] = &[
    (NamedBase::Gra, "sunrise", "sunset"),
    (NamedBase::Mga, "sunrise - 72min", "sunset + 72min"),
    (NamedBase::Mga60, "sunrise - 60min", "sunset + 60min"),
    (NamedBase::Mga72, "sunrise - 72min", "sunset + 72min"),
    (NamedBase::Mga90, "sunrise - 90min", "sunset + 90min"),
    (NamedBase::Mga96, "sunrise - 96min", "sunset + 96min"),
    (NamedBase::Mga120, "sunrise - 120min", "sunset + 120min"),
    (
        NamedBase::Mga72Zmanis,
        "proportional_minutes(72, before_sunrise)",
        "proportional_minutes(72, after_sunset)",
    ),
    (
        NamedBase::Mga90Zmanis,
        "proportional_minutes(90, before_sunrise)",
        "proportional_minutes(90, after_sunset)",
    ),
    (
        NamedBase::Mga96Zmanis,
        "proportional_minutes(96, before_sunrise)",
        "proportional_minutes(96, after_sunset)",
    ),
    (
        NamedBase::Mga16Point1,
        "solar(16.1, before_sunrise)",
        "solar(16.1, after_sunset)",
    ),
    (NamedBase::Mga18, "solar(18, before_sunrise)", "solar(18, after_sunset)"),
    (
        NamedBase::Mga19Point8,
        "solar(19.8, before_sunrise)",
        "solar(19.8, after_sunset)",
    ),
    (NamedBase::Mga26, "solar(26, before_sunrise)", "solar(26, after_sunset)"),
    (
        NamedBase::BaalHatanya,
        "solar(1.583, before_sunrise)",
        "solar(1.583, after_sunset)",
    ),
    (NamedBase::AteretTorah, "sunrise", "sunset + 40min"),
];

impl NamedBase {
    /// Source text of the formulas bounding this convention's day
    pub fn boundaries(&self) -> (&'static str, &'static str) {
        BASE_BOUNDARIES
            .iter()
            .find(|(base, _, _)| base == self)
            .map(|(_, start, end)| (*start, *end))
            .unwrap_or(("sunrise", "sunset"))
    }
}

/// A day-boundary convention: a named shita or an explicit start/end pair
#[derive(Debug, Clone, PartialEq)]
pub enum OpinionBase {
    Named(NamedBase),
    Custom(Box<Expression>, Box<Expression>),
}

impl fmt::Display for OpinionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpinionBase::Named(base) => write!(f, "{}", base),
            OpinionBase::Custom(start, end) => write!(f, "custom({}, {})", start, end),
        }
    }
}

fn arithmetic_precedence(expr: &Expression) -> Option<u8> {
    match &expr.kind {
        ExpressionKind::Arithmetic(_, op, _) => Some(op.precedence()),
        _ => None,
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionKind::Number(n) => write!(f, "{}", n.normalize()),
            ExpressionKind::Duration(n, unit) => {
                write!(f, "{}{}", n.normalize(), unit.canonical_suffix())
            }
            ExpressionKind::ClockTime(time) => {
                if time.second() == 0 {
                    write!(f, "{}", time.format("%H:%M"))
                } else {
                    write!(f, "{}", time.format("%H:%M:%S"))
                }
            }
            ExpressionKind::Primitive(primitive) => write!(f, "{}", primitive),
            ExpressionKind::Direction(direction) => write!(f, "{}", direction),
            ExpressionKind::Base(base) => write!(f, "{}", base),
            ExpressionKind::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExpressionKind::Arithmetic(left, op, right) => {
                // Left-associative: the right operand needs parentheses at equal precedence.
                let own = op.precedence();
                match arithmetic_precedence(left) {
                    Some(p) if p < own => write!(f, "({})", left)?,
                    _ => write!(f, "{}", left)?,
                }
                write!(f, " {} ", op.symbol())?;
                match arithmetic_precedence(right) {
                    Some(p) if p <= own => write!(f, "({})", right),
                    _ => write!(f, "{}", right),
                }
            }
            ExpressionKind::Reference(key) => write!(f, "@{}", key),
            ExpressionKind::Variable(variable) => write!(f, "{}", variable),
            ExpressionKind::DateLiteral { day, month } => {
                match month_name(*month) {
                    Some(name) => write!(f, "{}-{}", day, name),
                    None => write!(f, "{}-{}", day, month),
                }
            }
            ExpressionKind::Season(season) => write!(f, "\"{}\"", season),
            ExpressionKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                write!(f, "if ({}) {{ {} }}", condition, then)?;
                match otherwise.as_deref() {
                    Some(nested) if matches!(nested.kind, ExpressionKind::Conditional { .. }) => {
                        write!(f, " else {}", nested)
                    }
                    Some(otherwise) => write!(f, " else {{ {} }}", otherwise),
                    None => Ok(()),
                }
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare(left, op, right) => write!(f, "{} {} {}", left, op.symbol(), right),
            Condition::And(left, right) | Condition::Or(left, right) => {
                let own = self.precedence();
                let symbol = if matches!(self, Condition::And(..)) {
                    "&&"
                } else {
                    "||"
                };
                if left.precedence() < own {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", symbol)?;
                if right.precedence() <= own {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
            Condition::Not(inner) => match inner.as_ref() {
                Condition::Not(_) => write!(f, "!{}", inner),
                _ => write!(f, "!({})", inner),
            },
        }
    }
}
