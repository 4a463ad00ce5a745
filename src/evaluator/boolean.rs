//! Boolean algebra over pre-computed operands, parsed with chumsky
//!
//! Precedence is `!` over `&&` over `||`, both binary operators fold left.

use std::fmt;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::token::Span;

/// A reduced expression token: operands are already `1`/`0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolTok {
    Operand(bool),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for BoolTok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolTok::Operand(true) => write!(f, "1"),
            BoolTok::Operand(false) => write!(f, "0"),
            BoolTok::Not => write!(f, "!"),
            BoolTok::And => write!(f, "&&"),
            BoolTok::Or => write!(f, "||"),
            BoolTok::Open => write!(f, "("),
            BoolTok::Close => write!(f, ")"),
        }
    }
}

/// Why a reduced expression could not be evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionError {
    pub span: Span,
    /// Offending token, `None` at the end of the expression
    pub found: Option<BoolTok>,
    pub message: String,
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, bool, extra::Err<Rich<'a, BoolTok>>> + Clone
where
    I: ValueInput<'a, Token = BoolTok, Span = SimpleSpan>,
{
    recursive(|expr| {
        let atom = select! { BoolTok::Operand(v) => v }
            .or(expr.delimited_by(just(BoolTok::Open), just(BoolTok::Close)));

        let unary = just(BoolTok::Not)
            .repeated()
            .foldr(atom, |_, v: bool| !v);

        let conjunction = unary
            .clone()
            .foldl(just(BoolTok::And).ignore_then(unary).repeated(), |l, r| {
                l && r
            });

        conjunction
            .clone()
            .foldl(just(BoolTok::Or).ignore_then(conjunction).repeated(), |l, r| {
                l || r
            })
    })
    .then_ignore(end())
}

/// Evaluate a reduced expression. `end` is the source offset used for
/// errors at the end of input.
pub fn evaluate(tokens: &[(BoolTok, Span)], end: usize) -> Result<bool, ExpressionError> {
    let token_stream = Stream::from_iter(
        tokens
            .iter()
            .map(|(tok, span)| (*tok, SimpleSpan::from(span.clone()))),
    )
    .map((end..end).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            let mut errs = errs.into_iter();
            match errs.next() {
                Some(err) => ExpressionError {
                    span: err.span().into_range(),
                    found: err.found().copied(),
                    message: err.to_string(),
                },
                None => ExpressionError {
                    span: end..end,
                    found: None,
                    message: "malformed expression".to_string(),
                },
            }
        })
}
