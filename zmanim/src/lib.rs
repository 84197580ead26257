//! # Zmanim Engine
//!
//! **Halachic times from a small formula language**
//!
//! Zmanim are written as short formulas over astronomical events and
//! proportional-hour conventions, e.g. `sunrise - 72min` or
//! `proportional_hours(3, gra)`. Formulas may reference each other with
//! `@key`. A calendar classifier and a tag selector decide which formulas
//! apply on a given day before anything is computed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{FixedOffset, NaiveDate};
//! use zmanim::{BatchRequest, Engine, Location, NoaaProvider, ZmanDefinition, ZmanimResult};
//!
//! fn main() -> ZmanimResult<()> {
//!     let mut engine = Engine::new(NoaaProvider::new());
//!
//!     engine.add_zmanim([
//!         ZmanDefinition::new("alos_72", "sunrise - 72min"),
//!         ZmanDefinition::new("sof_zman_shema_gra", "proportional_hours(3, gra)"),
//!         ZmanDefinition::new("tzais_72", "sunset + (sunrise - @alos_72)"),
//!     ])?;
//!
//!     let offset = FixedOffset::west_opt(5 * 3600).unwrap();
//!     let location = Location::new(40.0828, -74.2094, offset);
//!     let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
//!
//!     let response = engine.calculate(&BatchRequest::new(date, location));
//!     for result in &response.results {
//!         println!("{}: {}", result.key, result.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Formulas
//! Primitives (`sunrise`, `sunset`, `solar_noon`, ...), clock times
//! (`18:30`), durations (`72min`, `1.5hr`) and builtin functions combined
//! with `+ - * /`.
//!
//! ### Opinion bases
//! `gra`, `mga` and friends name a pair of day boundaries; `custom(start, end)`
//! builds one from arbitrary times. Proportional hours divide that day by 12.
//!
//! ### Events and tags
//! Calendar titles are matched against `%` wildcard patterns to produce the
//! day's active event codes. Each zman's tags decide whether it applies.

pub mod ast;
pub mod astronomy;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod parser;
pub mod resource_limits;
pub mod response;
pub mod selector;
pub mod semantic;
pub mod validator;
pub mod value;

pub use ast::Span;
pub use astronomy::{AstronomicalProvider, FixedProvider, Location, NoaaProvider, ProviderError};
pub use engine::{BatchRequest, Engine, ZmanDefinition};
pub use error::{ErrorKind, ZmanimError};
pub use evaluator::{evaluate, evaluate_formula, ExecutionContext, FormulaRegistry};
pub use events::{ActiveEventSet, EventClassifier, EventPatternMapping, WildcardPattern};
pub use parser::{parse, parse_with_limits};
pub use resource_limits::ResourceLimits;
pub use response::{BatchResponse, RoundingMode, ZmanResult};
pub use selector::{should_include, TagAssociation, TagType};
pub use semantic::*;
pub use validator::{validate, StaticType, Validator};
pub use value::Value;

/// Result type for zmanim operations
pub type ZmanimResult<T> = Result<T, ZmanimError>;

#[cfg(test)]
mod tests;
