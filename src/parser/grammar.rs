//! Normaliser: turns one instruction's token tree into a [`Command`]
//!
//! Grammar, consumed left to right with no backtracking:
//!
//! ```text
//! [!|!!] VALUE ACTION [PARAM] [(ARGS)] [!|!!] [{CONDITION}]
//! ```

use crate::error::ParseError;
use crate::evaluator::{is_compare_operator, Evaluator};
use crate::parser::command::{Action, Command};
use crate::parser::token::{Delimiter, Instruction, Token, TokenKind};
use crate::value::{Context, Value};

const NEGATIONS: [&str; 2] = ["!", "!!"];

/// Cursor over an immutable token buffer
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token when it is a `!`/`!!` negation
    fn negation(&mut self, instruction: &str) -> Result<u8, ParseError> {
        let Some(token) = self.peek() else {
            return Ok(0);
        };
        match token.as_operator() {
            Some("!") => {
                self.pos += 1;
                Ok(1)
            }
            Some("!!") => {
                self.pos += 1;
                Ok(2)
            }
            Some(_) => Err(ParseError::unknown_operator(token, &NEGATIONS, instruction)),
            None => Ok(0),
        }
    }

    /// Consume the next token when it is a block with `delimiter`
    fn block(&mut self, delimiter: Delimiter) -> Option<&'t Token> {
        let token = self.peek()?;
        let block = token.as_block()?;
        if block.delimiter != delimiter {
            return None;
        }
        self.pos += 1;
        Some(token)
    }
}

/// Parse one instruction against a data context
pub fn parse(instruction: &Instruction, context: &Context) -> Result<Command, ParseError> {
    let source = instruction.source.as_str();
    let end = instruction.span.end;
    let evaluator = Evaluator::new(context, source);
    let mut cursor = Cursor::new(&instruction.tokens);

    let negate_count = cursor.negation(source)?;

    // VALUE
    let value_token = cursor
        .next()
        .ok_or_else(|| ParseError::unexpected(None, "a variable, text or block", end, source))?;
    let mut variable = None;
    let raw = match &value_token.kind {
        TokenKind::Generic(_) | TokenKind::Text(_) | TokenKind::Block(_)
            if cursor.peek().is_some_and(is_compare_operator) && cursor.peek_at(1).is_some() =>
        {
            let operator = cursor.next();
            let right = cursor.next();
            match (operator, right) {
                (Some(operator), Some(right)) => {
                    Value::Bool(evaluator.compare(value_token, operator, right)?)
                }
                _ => Value::Null,
            }
        }
        TokenKind::Generic(path) => {
            variable = Some(path.clone());
            context.lookup(path)
        }
        TokenKind::Text(literal) => literal.to_value(),
        TokenKind::Block(block) => Value::Bool(evaluator.evaluate_block(&block.tokens)?),
        TokenKind::Operator(_) | TokenKind::Separator => {
            return Err(ParseError::unexpected(
                Some(value_token),
                "a variable, text or block",
                end,
                source,
            ))
        }
    };

    // ACTION
    let action_token = cursor
        .next()
        .ok_or_else(|| ParseError::unexpected(None, "an action", end, source))?;
    let word = match &action_token.kind {
        TokenKind::Generic(word) | TokenKind::Operator(word) => word.as_str(),
        _ => {
            return Err(ParseError::unexpected(
                Some(action_token),
                "an action",
                end,
                source,
            ))
        }
    };
    let (action, embedded) = Action::resolve(word).ok_or_else(|| ParseError::UnknownAction {
        span: action_token.span.clone(),
        found: action_token.describe(),
        instruction: source.to_string(),
    })?;

    // PARAM
    let parameter = match embedded {
        Some(param) => Some(param),
        None => match cursor.peek().map(|t| &t.kind) {
            Some(TokenKind::Generic(word)) => {
                cursor.next();
                Some(word.clone())
            }
            Some(TokenKind::Text(literal)) => {
                cursor.next();
                Some(literal.text())
            }
            _ => None,
        },
    };

    // ARGS
    let mut arguments = Vec::new();
    if let Some(token) = cursor.block(Delimiter::Paren) {
        if !action.accepts_arguments() {
            return Err(ParseError::InvalidArguments {
                span: token.span.clone(),
                action,
                found: token.describe(),
                instruction: source.to_string(),
            });
        }
        if let Some(block) = token.as_block() {
            arguments = evaluator.arguments(block)?;
        }
    }

    // CONDITION
    let condition_negate = cursor.negation(source)?;
    let mut condition = true;
    if let Some(token) = cursor.next() {
        match &token.kind {
            TokenKind::Block(block) if block.delimiter == Delimiter::Brace => {
                condition = evaluator.evaluate_block(&block.tokens)?;
            }
            _ => {
                return Err(ParseError::unexpected(
                    Some(token),
                    "a {condition} block or the end of the instruction",
                    end,
                    source,
                ))
            }
        }
    }
    if condition_negate % 2 == 1 {
        condition = !condition;
    }

    if let Some(token) = cursor.next() {
        return Err(ParseError::unexpected(
            Some(token),
            "the end of the instruction",
            end,
            source,
        ));
    }

    let value = raw.to_scalar().negate(negate_count);
    let value_as_bool = value.is_truthy();
    Ok(Command {
        negate_count,
        variable,
        value,
        value_as_bool,
        action,
        parameter,
        arguments,
        condition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn data() -> Value {
        Value::from(json!({
            "user": {"name": "Ann", "id": 7, "tags": ["a", "b", "c"]},
            "count": 0,
            "isPaid": true,
            "title": "Hello",
            "zip": "00"
        }))
    }

    fn parse_one(source: &str) -> Result<Command, ParseError> {
        let data = data();
        let ctx = Context::new(&data);
        let instructions = tokenize(source);
        assert_eq!(instructions.len(), 1, "expected one instruction in {:?}", source);
        parse(&instructions[0], &ctx)
    }

    #[test]
    fn test_text_from_variable() {
        let command = parse_one("user.name .").unwrap();
        assert_eq!(
            command,
            Command::new(Action::Text, Value::from("Ann")).with_variable("user.name")
        );
    }

    #[test]
    fn test_attr_shortcut_with_parameter() {
        let command = parse_one("title @data-title").unwrap();
        assert_eq!(command.action, Action::Attr);
        assert_eq!(command.parameter.as_deref(), Some("data-title"));
        assert_eq!(command.value, Value::from("Hello"));
    }

    #[test]
    fn test_keyword_action_with_parameter() {
        let command = parse_one("title attr 'aria-label'").unwrap();
        assert_eq!(command.action, Action::Attr);
        assert_eq!(command.parameter.as_deref(), Some("aria-label"));
    }

    #[test]
    fn test_negation() {
        let command = parse_one("!isPaid !").unwrap();
        assert_eq!(command.negate_count, 1);
        assert_eq!(command.value, Value::Bool(false));
        assert!(!command.value_as_bool);
        assert_eq!(command.action, Action::Remove);

        let command = parse_one("!!user.name ?").unwrap();
        assert_eq!(command.value, Value::Bool(true));
        assert_eq!(command.action, Action::Toggle);
    }

    #[test]
    fn test_negated_missing_variable_stays_null() {
        let command = parse_one("!nobody .").unwrap();
        assert_eq!(command.value, Value::Null);
        assert!(!command.value_as_bool);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(parse_one("user.tags .").unwrap().value, Value::Number(3.0));
        assert_eq!(parse_one("user .").unwrap().value, Value::Number(3.0));
        assert_eq!(parse_one("'42' .").unwrap().value, Value::Number(42.0));
        assert_eq!(parse_one("zip .").unwrap().value, Value::Number(0.0));
        assert_eq!(parse_one("'x' .").unwrap().value, Value::from("x"));
    }

    #[test]
    fn test_block_value() {
        let command = parse_one("{isPaid && user.name} .active").unwrap();
        assert_eq!(command.value, Value::Bool(true));
        assert_eq!(command.action, Action::Class);
        assert_eq!(command.parameter.as_deref(), Some("active"));
        assert_eq!(command.variable, None);
    }

    #[test]
    fn test_comparison_value() {
        let command = parse_one("count > 0 ?").unwrap();
        assert_eq!(command.value, Value::Bool(false));
        assert!(!command.value_as_bool);
        assert_eq!(command.action, Action::Toggle);

        let command = parse_one("user.id == 7 .shown").unwrap();
        assert!(command.value_as_bool);
    }

    #[test]
    fn test_condition() {
        let command = parse_one("title . {isPaid}").unwrap();
        assert!(command.condition);
        let command = parse_one("title . !{isPaid}").unwrap();
        assert!(!command.condition);
        let command = parse_one("title . {count > 0 || !isPaid}").unwrap();
        assert!(!command.condition);
        let command = parse_one("title . !!{isPaid}").unwrap();
        assert!(command.condition);
    }

    #[test]
    fn test_call_with_arguments() {
        let command = parse_one("user.id *notify(user.name, 'x', 2) {isPaid}").unwrap();
        assert_eq!(command.action, Action::Call);
        assert_eq!(command.parameter.as_deref(), Some("notify"));
        assert_eq!(
            command.arguments,
            vec![Value::from("Ann"), Value::from("x"), Value::Number(2.0)]
        );
        assert!(command.condition);
    }

    #[test]
    fn test_event_with_empty_arguments() {
        let command = parse_one("user :saved()").unwrap();
        assert_eq!(command.action, Action::Event);
        assert_eq!(command.parameter.as_deref(), Some("saved"));
        assert!(command.arguments.is_empty());
    }

    #[test]
    fn test_arguments_rejected_for_other_actions() {
        let err = parse_one("title @title(1)").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidArguments {
                action: Action::Attr,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_action() {
        let err = parse_one("title show").unwrap_err();
        match err {
            ParseError::UnknownAction {
                span,
                found,
                instruction,
            } => {
                assert_eq!(span, 6..10);
                assert_eq!(found, "generic 'show'");
                assert_eq!(instruction, "title show");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_action() {
        let err = parse_one("title").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { span, .. } if span == (5..5)));
    }

    #[test]
    fn test_invalid_negation() {
        let err = parse_one("!!!title .").unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperator { .. }));
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        let err = parse_one("title . {isPaid} extra").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
        let err = parse_one("title . [isPaid]").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_error_message_echoes_instruction() {
        let err = parse_one("title . {isPaid} extra").unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @r#"unexpected generic 'extra', expected the end of the instruction in "title . {isPaid} extra""#
        );
    }
}
