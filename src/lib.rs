//! Z-Template - A data-binding instruction engine
//!
//! This library provides the tokenizer, normaliser and evaluator for the
//! compact instruction language written in `z-var` attributes, a keyed
//! reconciler for repeated regions, and an in-memory projector that applies
//! the resulting commands to elements.
//!
//! # Example
//!
//! ```rust
//! use z_template::{prepare, Action, Context, Value};
//!
//! let data = Value::from(serde_json::json!({"user": {"name": "Ann"}}));
//! let commands = prepare("user.name @title, user.name .", &Context::new(&data)).unwrap();
//! assert_eq!(commands[0].action, Action::Attr);
//! assert_eq!(commands[1].value, Value::from("Ann"));
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod projector;
pub mod reconcile;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use error::ParseError;
pub use evaluator::Evaluator;
pub use parser::{parse, tokenize, Action, Command, Instruction, Token, TokenKind};
pub use projector::{Callbacks, Detail, DispatchError, Dispatcher, Element, Projector, RenderReport};
pub use reconcile::{collect_items, reconcile, Edit, RepeatItem, RepeatMarker, RepeatRegion};
pub use value::{Context, Value};

use thiserror::Error;

/// Errors that can occur while preparing or applying instructions
#[derive(Debug, Error)]
pub enum EngineError {
    /// One or more instructions failed to parse
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// A callback could not be dispatched
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl From<Vec<ParseError>> for EngineError {
    fn from(errors: Vec<ParseError>) -> Self {
        EngineError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tokenize and normalise every instruction of `source`, keeping each
/// instruction's own result.
///
/// A failing instruction does not affect its siblings.
pub fn prepare_each(source: &str, context: &Context) -> Vec<Result<Command, ParseError>> {
    tokenize(source)
        .iter()
        .map(|instruction| parse(instruction, context))
        .collect()
}

/// Tokenize and normalise every instruction of `source`
///
/// Fails with all parse errors when any instruction is invalid.
///
/// # Example
///
/// ```rust
/// use z_template::{prepare, Context, EngineError, Value};
///
/// let data = Value::from(serde_json::json!({"count": 3}));
/// let ctx = Context::new(&data);
///
/// let commands = prepare("count > 0 ?", &ctx).unwrap();
/// assert!(commands[0].value_as_bool);
///
/// let err = prepare("count bogus, count frobnicate", &ctx).unwrap_err();
/// assert!(matches!(err, EngineError::Parse(errors) if errors.len() == 2));
/// ```
pub fn prepare(source: &str, context: &Context) -> Result<Vec<Command>, EngineError> {
    let mut commands = Vec::new();
    let mut errors = Vec::new();
    for result in prepare_each(source, context) {
        match result {
            Ok(command) => commands.push(command),
            Err(err) => errors.push(err),
        }
    }
    if errors.is_empty() {
        Ok(commands)
    } else {
        Err(errors.into())
    }
}
