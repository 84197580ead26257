use ariadne::{Color, Label, Report, ReportKind, Source};
use zmanim::ZmanimError;

/// Format a ZmanimError with fancy terminal output using Ariadne
///
/// `source_id` names where the formula came from: a zman key or `<formula>`.
pub fn format_error(error: &ZmanimError, source_id: &str) -> String {
    let Some(details) = error.details() else {
        return match error {
            ZmanimError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
                suggestion,
            } => format!(
                "Resource limit exceeded: {}\n  Limit: {}\n  Actual: {}\n  {}",
                limit_name, limit_value, actual_value, suggestion
            ),
            other => other.to_string(),
        };
    };

    let error_type = match error {
        ZmanimError::Parse(_) => "Parse error",
        ZmanimError::UnknownFunction { .. } => "Unknown function",
        _ => "Validation error",
    };
    let message = format!(
        "{}: {} (in {} at column {})",
        error_type, details.message, source_id, details.span.col
    );

    let end = details.span.end.max(details.span.start + 1);
    let mut report = Report::build(ReportKind::Error, source_id, details.span.start)
        .with_message(message)
        .with_label(
            Label::new((source_id, details.span.start..end))
                .with_message("")
                .with_color(Color::Red),
        );

    if let Some(suggestion) = &details.suggestion {
        report = report.with_help(suggestion);
    }

    let mut output = Vec::new();
    match report.finish().write(
        (source_id, Source::from(details.source_text.as_ref())),
        &mut output,
    ) {
        Ok(_) => String::from_utf8_lossy(&output).to_string(),
        Err(_) => error.to_string(),
    }
}
