use crate::ast::Span;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Detailed error information with source location
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetails {
    pub message: String,
    pub span: Span,
    pub source_text: Arc<str>,
    pub suggestion: Option<String>,
}

/// Error types for the zmanim engine
///
/// Every variant is a plain value so that a failed formula can be carried
/// through a batch as its result instead of aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub enum ZmanimError {
    /// Malformed formula syntax
    Parse(Box<ErrorDetails>),

    /// Wrong argument count, argument kind or numeric domain
    Validation(Box<ErrorDetails>),

    /// `@key` does not name a known formula
    Reference { key: String },

    /// A formula transitively references itself; `chain` starts and ends with the same key
    Cycle { chain: Vec<String> },

    /// A call to a function the library does not provide
    UnknownFunction {
        name: String,
        details: Box<ErrorDetails>,
    },

    /// The astronomical provider could not produce a time, or arithmetic overflowed
    Computation(String),

    ResourceLimitExceeded {
        limit_name: String,
        limit_value: String,
        actual_value: String,
        suggestion: String,
    },

    /// Engine configuration error without a source location
    Engine(String),
}

/// Machine-readable error classification used in batch output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Validation,
    Reference,
    Cycle,
    UnknownFunction,
    Computation,
    ResourceLimitExceeded,
    Engine,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Reference => "reference",
            ErrorKind::Cycle => "cycle",
            ErrorKind::UnknownFunction => "unknown_function",
            ErrorKind::Computation => "computation",
            ErrorKind::ResourceLimitExceeded => "resource_limit_exceeded",
            ErrorKind::Engine => "engine",
        };
        write!(f, "{}", name)
    }
}

impl ZmanimError {
    /// Create a parse error with source information
    pub fn parse(message: impl Into<String>, span: Span, source_text: Arc<str>) -> Self {
        Self::Parse(Box::new(ErrorDetails {
            message: message.into(),
            span,
            source_text,
            suggestion: None,
        }))
    }

    /// Create a parse error with suggestion
    pub fn parse_with_suggestion(
        message: impl Into<String>,
        span: Span,
        source_text: Arc<str>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Parse(Box::new(ErrorDetails {
            message: message.into(),
            span,
            source_text,
            suggestion: Some(suggestion.into()),
        }))
    }

    /// Create a validation error with source information
    pub fn validation(message: impl Into<String>, span: Span, source_text: Arc<str>) -> Self {
        Self::Validation(Box::new(ErrorDetails {
            message: message.into(),
            span,
            source_text,
            suggestion: None,
        }))
    }

    /// Create a validation error with suggestion
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        span: Span,
        source_text: Arc<str>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation(Box::new(ErrorDetails {
            message: message.into(),
            span,
            source_text,
            suggestion: Some(suggestion.into()),
        }))
    }

    pub fn unknown_function(name: impl Into<String>, span: Span, source_text: Arc<str>) -> Self {
        let name = name.into();
        Self::UnknownFunction {
            details: Box::new(ErrorDetails {
                message: format!("unknown function '{}'", name),
                span,
                source_text,
                suggestion: Some(
                    "available functions: solar, seasonal_solar, proportional_hours, proportional_minutes, shaah_zmanis, midpoint"
                        .to_string(),
                ),
            }),
            name,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ZmanimError::Parse(_) => ErrorKind::Parse,
            ZmanimError::Validation(_) => ErrorKind::Validation,
            ZmanimError::Reference { .. } => ErrorKind::Reference,
            ZmanimError::Cycle { .. } => ErrorKind::Cycle,
            ZmanimError::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            ZmanimError::Computation(_) => ErrorKind::Computation,
            ZmanimError::ResourceLimitExceeded { .. } => ErrorKind::ResourceLimitExceeded,
            ZmanimError::Engine(_) => ErrorKind::Engine,
        }
    }

    /// Source-located details, when the error points into formula text
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            ZmanimError::Parse(details) | ZmanimError::Validation(details) => Some(details),
            ZmanimError::UnknownFunction { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl fmt::Display for ZmanimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZmanimError::Parse(details) => {
                write!(f, "Parse error: {}", details.message)?;
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                write!(f, " at {}:{}", details.span.line, details.span.col)
            }
            ZmanimError::Validation(details) => {
                write!(f, "Validation error: {}", details.message)?;
                if let Some(suggestion) = &details.suggestion {
                    write!(f, " (suggestion: {})", suggestion)?;
                }
                write!(f, " at {}:{}", details.span.line, details.span.col)
            }
            ZmanimError::Reference { key } => write!(f, "Reference error: unknown zman '@{}'", key),
            ZmanimError::Cycle { chain } => write!(f, "Cycle error: {}", chain.join(" -> ")),
            ZmanimError::UnknownFunction { name, details } => write!(
                f,
                "Unknown function: '{}' at {}:{}",
                name, details.span.line, details.span.col
            ),
            ZmanimError::Computation(msg) => write!(f, "Computation error: {}", msg),
            ZmanimError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
                suggestion,
            } => write!(
                f,
                "Resource limit exceeded: {} (limit {}, actual {}). {}",
                limit_name, limit_value, actual_value, suggestion
            ),
            ZmanimError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for ZmanimError {}

impl From<crate::astronomy::ProviderError> for ZmanimError {
    fn from(err: crate::astronomy::ProviderError) -> Self {
        ZmanimError::Computation(err.to_string())
    }
}
