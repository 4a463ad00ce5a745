//! Evaluation of operand tokens and boolean blocks against a data context
//!
//! Blocks are never interpreted directly. Every operand is first reduced to
//! its truthiness (comparisons included), and the resulting `1`/`0` algebra
//! is handed to the [`boolean`] parser.

pub mod boolean;

use std::cmp::Ordering;

use crate::error::ParseError;
use crate::parser::token::{Block, Span, Token, TokenKind};
use crate::value::{Context, Value};

use boolean::BoolTok;

pub const COMPARE_OPERATORS: [&str; 6] = ["==", "!=", "<", "<=", ">", ">="];
pub const BOOLEAN_OPERATORS: [&str; 3] = ["!", "&&", "||"];

pub fn is_compare_operator(token: &Token) -> bool {
    token
        .as_operator()
        .is_some_and(|op| COMPARE_OPERATORS.contains(&op))
}

fn is_operand(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Generic(_) | TokenKind::Text(_) | TokenKind::Block(_)
    )
}

/// Order two coerced values. Only numbers, strings and booleans are ordered
/// among themselves.
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Evaluates tokens of one instruction
pub struct Evaluator<'a> {
    context: &'a Context<'a>,
    instruction: &'a str,
}

impl<'a> Evaluator<'a> {
    /// `instruction` is the instruction text quoted in errors
    pub fn new(context: &'a Context<'a>, instruction: &'a str) -> Self {
        Self {
            context,
            instruction,
        }
    }

    /// Raw value of an operand: a lookup, a literal, or a block's result
    pub fn token_value(&self, token: &Token) -> Result<Value, ParseError> {
        match &token.kind {
            TokenKind::Generic(path) => Ok(self.context.lookup(path)),
            TokenKind::Text(literal) => Ok(literal.to_value()),
            TokenKind::Block(block) => Ok(Value::Bool(self.evaluate_block(&block.tokens)?)),
            TokenKind::Operator(_) | TokenKind::Separator => Err(ParseError::unexpected(
                Some(token),
                "a variable, text or block",
                token.span.end,
                self.instruction,
            )),
        }
    }

    /// Operand value coerced to a scalar, then negated `negate_count` times
    pub fn to_value(&self, token: &Token, negate_count: u8) -> Result<Value, ParseError> {
        Ok(self.token_value(token)?.to_scalar().negate(negate_count))
    }

    /// Compare two operands with one of `== != < <= > >=`
    pub fn compare(&self, left: &Token, operator: &Token, right: &Token) -> Result<bool, ParseError> {
        if !matches!(right.kind, TokenKind::Generic(_) | TokenKind::Text(_)) {
            return Err(ParseError::unexpected(
                Some(right),
                "a variable or text after the comparison",
                right.span.end,
                self.instruction,
            ));
        }
        let l = self.to_value(left, 0)?;
        let r = self.to_value(right, 0)?;

        let result = match operator.as_operator() {
            Some("==") => l == r,
            Some("!=") => l != r,
            Some("<") => ordering(&l, &r) == Some(Ordering::Less),
            Some("<=") => matches!(ordering(&l, &r), Some(Ordering::Less | Ordering::Equal)),
            Some(">") => ordering(&l, &r) == Some(Ordering::Greater),
            Some(">=") => matches!(
                ordering(&l, &r),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            _ => {
                return Err(ParseError::unknown_operator(
                    operator,
                    &COMPARE_OPERATORS,
                    self.instruction,
                ))
            }
        };
        Ok(result)
    }

    /// Evaluate the inside of a block as a boolean expression. An empty
    /// block is `false`.
    pub fn evaluate_block(&self, tokens: &[Token]) -> Result<bool, ParseError> {
        let mut reduced = Vec::new();
        self.reduce(tokens, &mut reduced)?;
        if reduced.is_empty() {
            return Ok(false);
        }

        let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
        boolean::evaluate(&reduced, end).map_err(|err| ParseError::Expression {
            found: match err.found {
                Some(tok) => format!("'{}'", tok),
                None => "end of block".to_string(),
            },
            span: err.span,
            message: err.message,
            instruction: self.instruction.to_string(),
        })
    }

    fn reduce(&self, tokens: &[Token], out: &mut Vec<(BoolTok, Span)>) -> Result<(), ParseError> {
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];

            // An operand followed by a comparison operator and another token
            // is reduced as one unit
            if is_operand(token) && i + 2 < tokens.len() && is_compare_operator(&tokens[i + 1]) {
                let right = &tokens[i + 2];
                let result = self.compare(token, &tokens[i + 1], right)?;
                out.push((BoolTok::Operand(result), token.span.start..right.span.end));
                i += 3;
                continue;
            }

            match &token.kind {
                TokenKind::Generic(_) | TokenKind::Text(_) => {
                    let truthy = self.token_value(token)?.is_truthy();
                    out.push((BoolTok::Operand(truthy), token.span.clone()));
                }
                TokenKind::Block(block) => {
                    let open = token.span.start..token.span.start + 1;
                    let close = token.span.end.saturating_sub(1)..token.span.end;
                    out.push((BoolTok::Open, open));
                    let before = out.len();
                    self.reduce(&block.tokens, out)?;
                    if out.len() == before {
                        out.push((BoolTok::Operand(false), token.span.clone()));
                    }
                    out.push((BoolTok::Close, close));
                }
                TokenKind::Operator(op) => {
                    let tok = match op.as_str() {
                        "!" => BoolTok::Not,
                        "&&" => BoolTok::And,
                        "||" => BoolTok::Or,
                        _ => {
                            return Err(ParseError::unknown_operator(
                                token,
                                &BOOLEAN_OPERATORS,
                                self.instruction,
                            ))
                        }
                    };
                    out.push((tok, token.span.clone()));
                }
                TokenKind::Separator => {
                    return Err(ParseError::unexpected(
                        Some(token),
                        "an operand or operator",
                        token.span.end,
                        self.instruction,
                    ))
                }
            }
            i += 1;
        }
        Ok(())
    }

    /// Resolve a `( … )` argument list. Groups are split on separators: a
    /// single token resolves to its raw value, a longer group is evaluated
    /// as a boolean block.
    pub fn arguments(&self, block: &Block) -> Result<Vec<Value>, ParseError> {
        if block.tokens.is_empty() {
            return Ok(Vec::new());
        }
        block
            .tokens
            .split(|t| matches!(t.kind, TokenKind::Separator))
            .map(|group| match group {
                [single] => self.token_value(single),
                _ => self.evaluate_block(group).map(Value::Bool),
            })
            .collect()
    }
}
