//! Error types for instruction parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::command::Action;
use crate::parser::token::{Span, Token};

/// Fatal error for a single instruction
///
/// `found` is the offending token as `kind 'text'` (or `end of instruction`),
/// `instruction` the text of the whole instruction it was found in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected {found}, expected {expected} in \"{instruction}\"")]
    UnexpectedToken {
        span: Span,
        found: String,
        expected: String,
        instruction: String,
    },

    #[error("unknown action {found} in \"{instruction}\", supported actions: {}", Action::supported())]
    UnknownAction {
        span: Span,
        found: String,
        instruction: String,
    },

    #[error("unknown operator {found} in \"{instruction}\", supported operators: {supported}")]
    UnknownOperator {
        span: Span,
        found: String,
        supported: String,
        instruction: String,
    },

    #[error("action '{action}' takes no arguments, found {found} in \"{instruction}\"")]
    InvalidArguments {
        span: Span,
        action: Action,
        found: String,
        instruction: String,
    },

    #[error("invalid expression {found} in \"{instruction}\": {message}")]
    Expression {
        span: Span,
        found: String,
        message: String,
        instruction: String,
    },
}

impl ParseError {
    /// `token` missing (`None`) or of the wrong kind; `end` locates a missing token
    pub(crate) fn unexpected(
        token: Option<&Token>,
        expected: &str,
        end: usize,
        instruction: &str,
    ) -> Self {
        let (span, found) = match token {
            Some(token) => (token.span.clone(), token.describe()),
            None => (end..end, "end of instruction".to_string()),
        };
        ParseError::UnexpectedToken {
            span,
            found,
            expected: expected.to_string(),
            instruction: instruction.to_string(),
        }
    }

    pub(crate) fn unknown_operator(token: &Token, supported: &[&str], instruction: &str) -> Self {
        ParseError::UnknownOperator {
            span: token.span.clone(),
            found: token.describe(),
            supported: supported.join(", "),
            instruction: instruction.to_string(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnknownAction { span, .. }
            | ParseError::UnknownOperator { span, .. }
            | ParseError::InvalidArguments { span, .. }
            | ParseError::Expression { span, .. } => span,
        }
    }

    /// Text of the instruction the error was raised for
    pub fn instruction(&self) -> &str {
        match self {
            ParseError::UnexpectedToken { instruction, .. }
            | ParseError::UnknownAction { instruction, .. }
            | ParseError::UnknownOperator { instruction, .. }
            | ParseError::InvalidArguments { instruction, .. }
            | ParseError::Expression { instruction, .. } => instruction,
        }
    }

    /// Short message for the report label
    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken {
                found, expected, ..
            } => format!("found {}, expected {}", found, expected),
            ParseError::UnknownAction { found, .. } => {
                format!("{} is not an action: {}", found, Action::supported())
            }
            ParseError::UnknownOperator {
                found, supported, ..
            } => format!("{} is not one of {}", found, supported),
            ParseError::InvalidArguments { action, .. } => {
                format!("'{}' does not accept arguments", action)
            }
            ParseError::Expression { message, .. } => message.clone(),
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "Unexpected token",
            ParseError::UnknownAction { .. } => "Unknown action",
            ParseError::UnknownOperator { .. } => "Unknown operator",
            ParseError::InvalidArguments { .. } => "Unexpected arguments",
            ParseError::Expression { .. } => "Invalid expression",
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span().clone();
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.title())
            .with_label(
                Label::new((filename, span))
                    .with_message(self.label())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        if written.is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
