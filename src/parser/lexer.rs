//! Tokenizer for instruction lists using logos
//!
//! Lexing happens in two steps: logos produces a flat stream of lexemes, and
//! the tree builder folds bracketed runs into nested [`Block`] tokens and
//! splits the top level into one [`Instruction`] per comma.

use std::iter::Peekable;

use logos::Logos;

use crate::parser::token::{Block, Delimiter, Instruction, Literal, Span, Token, TokenKind};
use crate::value::parse_number;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum RawToken {
    #[token("{", |_| Delimiter::Brace)]
    #[token("[", |_| Delimiter::Bracket)]
    #[token("(", |_| Delimiter::Paren)]
    Open(Delimiter),

    #[token("}", |_| Delimiter::Brace)]
    #[token("]", |_| Delimiter::Bracket)]
    #[token(")", |_| Delimiter::Paren)]
    Close(Delimiter),

    #[token(",")]
    Comma,

    #[regex(r"[!=<>~|&]+", |lex| lex.slice().to_string())]
    Operator(String),

    // The closing quote is optional so an unterminated literal runs to the end of input
    #[regex(r#""([^"\\]|\\[\s\S])*"?"#, |lex| unquote(lex.slice()))]
    DoubleQuoted(String),

    #[regex(r#"'([^'\\]|\\[\s\S])*'?"#, |lex| unquote(lex.slice()))]
    SingleQuoted(String),

    #[regex(r#"([^ \t\r\n!=<>~|&,'"(){}\[\]\\]|\\[\s\S])+"#, |lex| unescape(lex.slice()))]
    Word(String),
}

/// Strip the quotes of a literal and resolve its escapes
fn unquote(slice: &str) -> String {
    let mut chars = slice.chars();
    let delimiter = chars.next();
    let mut value = String::new();
    let mut escaped = false;
    for c in chars {
        if escaped {
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if Some(c) == delimiter {
            break;
        } else {
            value.push(c);
        }
    }
    value
}

/// Resolve backslash escapes in a bare word
fn unescape(slice: &str) -> String {
    let mut value = String::with_capacity(slice.len());
    let mut escaped = false;
    for c in slice.chars() {
        if !escaped && c == '\\' {
            escaped = true;
        } else {
            value.push(c);
            escaped = false;
        }
    }
    value
}

/// Classify a bare word: numbers are literals, anything else is a generic token
fn word_kind(word: &str) -> Option<TokenKind> {
    let trimmed = word.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match parse_number(trimmed) {
        Some(n) => TokenKind::Text(Literal::Number(n)),
        None => TokenKind::Generic(trimmed.to_string()),
    })
}

/// Lex input string into flat lexemes with spans
pub fn lex(input: &str) -> impl Iterator<Item = (RawToken, Span)> + '_ {
    RawToken::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

struct TreeBuilder<I: Iterator<Item = (RawToken, Span)>> {
    lexemes: Peekable<I>,
    last_end: usize,
}

impl<I: Iterator<Item = (RawToken, Span)>> TreeBuilder<I> {
    /// Collect tokens until `closer` (or a top-level comma when `closer` is
    /// `None`) or the end of input.
    fn sequence(&mut self, closer: Option<Delimiter>) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some((raw, span)) = self.lexemes.next() {
            self.last_end = span.end;
            let kind = match raw {
                RawToken::Comma if closer.is_none() => break,
                RawToken::Comma => TokenKind::Separator,
                RawToken::Open(delimiter) => {
                    let inner = self.sequence(Some(delimiter));
                    tokens.push(Token::new(
                        TokenKind::Block(Block {
                            delimiter,
                            tokens: inner,
                        }),
                        span.start..self.last_end,
                    ));
                    continue;
                }
                RawToken::Close(delimiter) if Some(delimiter) == closer => break,
                RawToken::Close(delimiter) => TokenKind::Generic(delimiter.close().to_string()),
                RawToken::Operator(op) => TokenKind::Operator(op),
                RawToken::DoubleQuoted(value) => TokenKind::Text(Literal::Str {
                    value,
                    delimiter: '"',
                }),
                RawToken::SingleQuoted(value) => TokenKind::Text(Literal::Str {
                    value,
                    delimiter: '\'',
                }),
                RawToken::Word(word) => match word_kind(&word) {
                    Some(kind) => kind,
                    None => continue,
                },
            };
            tokens.push(Token::new(kind, span));
        }
        tokens
    }
}

/// Tokenize an instruction list into one token tree per instruction
///
/// Never fails: unterminated literals and blocks end at the end of input,
/// and empty instructions are dropped.
pub fn tokenize(input: &str) -> Vec<Instruction> {
    let mut builder = TreeBuilder {
        lexemes: lex(input).peekable(),
        last_end: 0,
    };

    let mut instructions = Vec::new();
    while builder.lexemes.peek().is_some() {
        let tokens = builder.sequence(None);
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            continue;
        };
        let span = first.span.start..last.span.end;
        instructions.push(Instruction {
            source: input[span.clone()].to_string(),
            span,
            tokens,
        });
    }
    instructions
}
