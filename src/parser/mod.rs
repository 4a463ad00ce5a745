//! Parser for the instruction language

pub mod command;
mod grammar;
pub mod lexer;
pub mod token;

pub use command::{Action, Command};
pub use grammar::parse;
pub use lexer::tokenize;
pub use token::{Block, Delimiter, Instruction, Literal, Span, Token, TokenKind};
