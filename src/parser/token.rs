//! Token tree produced by the tokenizer

use std::fmt;

use crate::value::{format_number, Value};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Bracket pair that opened a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `{ … }` condition or boolean sub-expression
    Brace,
    /// `[ … ]` alternatives
    Bracket,
    /// `( … )` argument list
    Paren,
}

impl Delimiter {
    pub fn open(self) -> char {
        match self {
            Delimiter::Brace => '{',
            Delimiter::Bracket => '[',
            Delimiter::Paren => '(',
        }
    }

    pub fn close(self) -> char {
        match self {
            Delimiter::Brace => '}',
            Delimiter::Bracket => ']',
            Delimiter::Paren => ')',
        }
    }
}

/// Literal carried by a text token
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted text, with the quote character that delimited it
    Str { value: String, delimiter: char },
    /// Bare numeric word
    Number(f64),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Str { value, .. } => Value::String(value.clone()),
            Literal::Number(n) => Value::Number(*n),
        }
    }

    /// The literal as plain text, without quotes
    pub fn text(&self) -> String {
        match self {
            Literal::Str { value, .. } => value.clone(),
            Literal::Number(n) => format_number(*n),
        }
    }
}

/// A nested token sequence between matching brackets
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub delimiter: Delimiter,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Variable reference or keyword
    Generic(String),
    Text(Literal),
    /// Run of operator characters (`! = < > ~ | &`)
    Operator(String),
    Block(Block),
    /// `,` inside a block
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TokenKind::Generic(_) => "generic",
            TokenKind::Text(_) => "text",
            TokenKind::Operator(_) => "operator",
            TokenKind::Block(_) => "block",
            TokenKind::Separator => "separator",
        }
    }

    /// Human-readable description for error messages, e.g. `operator '=='`
    pub fn describe(&self) -> String {
        format!("{} '{}'", self.kind_name(), self)
    }

    pub fn as_operator(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Operator(op) => Some(op.as_str()),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match &self.kind {
            TokenKind::Block(block) => Some(block),
            _ => None,
        }
    }
}

/// Characters that end a generic word unless escaped
pub(crate) fn is_special(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t'
            | '\r'
            | '\n'
            | '!'
            | '='
            | '<'
            | '>'
            | '~'
            | '|'
            | '&'
            | ','
            | '\''
            | '"'
            | '('
            | ')'
            | '{'
            | '}'
            | '['
            | ']'
            | '\\'
    )
}

fn write_sequence(f: &mut fmt::Formatter<'_>, tokens: &[Token]) -> fmt::Result {
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && !matches!(token.kind, TokenKind::Separator) {
            write!(f, " ")?;
        }
        write!(f, "{}", token)?;
    }
    Ok(())
}

/// Re-serialises the token so that tokenizing the output yields the same tree
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Generic(name) => {
                for c in name.chars() {
                    if is_special(c) {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
            TokenKind::Text(Literal::Number(n)) => write!(f, "{}", format_number(*n)),
            TokenKind::Text(Literal::Str { value, delimiter }) => {
                write!(f, "{}", delimiter)?;
                for c in value.chars() {
                    if c == *delimiter || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "{}", delimiter)
            }
            TokenKind::Operator(op) => write!(f, "{}", op),
            TokenKind::Block(block) => {
                write!(f, "{}", block.delimiter.open())?;
                write_sequence(f, &block.tokens)?;
                write!(f, "{}", block.delimiter.close())
            }
            TokenKind::Separator => write!(f, ","),
        }
    }
}

/// One comma-delimited unit of an instruction list
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Text of this instruction as written in the source
    pub source: String,
    /// Location of the instruction in the full source
    pub span: Span,
    pub tokens: Vec<Token>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sequence(f, &self.tokens)
    }
}
