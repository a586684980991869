//! Error types for constraint clause parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in clause text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("cannot parse clause '{clause}': {message}")]
    Syntax {
        clause: String,
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("clause '{clause}' has no comparison operator (expected one of <=, >=, <, >, =)")]
    MissingOperator { clause: String },

    #[error("unknown token '{token}' in clause '{clause}'")]
    UnknownToken {
        clause: String,
        token: String,
        span: Span,
    },
}

impl ParseError {
    /// The clause text this error refers to
    pub fn clause(&self) -> &str {
        match self {
            ParseError::Syntax { clause, .. }
            | ParseError::MissingOperator { clause }
            | ParseError::UnknownToken { clause, .. } => clause,
        }
    }

    /// Byte range within the clause
    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } | ParseError::UnknownToken { span, .. } => span.clone(),
            ParseError::MissingOperator { clause } => 0..clause.len(),
        }
    }

    /// Format the error with the clause as source context using ariadne
    pub fn format(&self, filename: &str) -> String {
        let clause = self.clause();
        let span = self.span();
        let label = match self {
            ParseError::Syntax {
                message, expected, ..
            } => {
                if expected.is_empty() {
                    message.clone()
                } else {
                    format!("{}\nExpected: {}", message, expected.join(", "))
                }
            }
            ParseError::MissingOperator { .. } => "no comparison operator".to_string(),
            ParseError::UnknownToken { token, .. } => {
                format!("'{}' is neither a number nor a coordinate", token)
            }
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(label)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(clause)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
