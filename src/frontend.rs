//! Reference frontend for the translatable Python subset.
//!
//! The code generator never depends on this module; it only produces the
//! [`Node`] trees the generator consumes.

use log::debug;

use crate::ast::Node;

pub use self::error::{FrontendError, FrontendResult};
pub use self::lexer::{Lexer, tokenize};
pub use self::parser::Parser;
pub use self::token::{Span, Token, TokenKind};

mod error;
mod lexer;
mod parser;
mod token;

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> FrontendResult<Node> {
    Parser::new(tokens).parse_module()
}

/// Tokenizes and parses `source` into a `Module` node.
pub fn parse(source: &str) -> FrontendResult<Node> {
    let tokens = tokenize(source)?;
    debug!("lexed {} tokens", tokens.len());
    parse_tokens(tokens)
}
