use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    Integer(i64),
    Float(f64),
    /// Raw contents between the quotes, escapes not yet processed.
    String(&'a str),

    // Keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Pass,

    // Operators
    Equal,        // =
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Less,         // <
    Greater,      // >
    LessEqual,    // <=
    GreaterEqual, // >=
    EqualEqual,   // ==
    NotEqual,     // !=

    // Delimiters
    Colon,    // :
    Comma,    // ,
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]

    // Structural
    Newline,
    Indent,
    Dedent,
    EOF,
}

impl TokenKind<'_> {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::Greater
                | Self::LessEqual
                | Self::GreaterEqual
                | Self::EqualEqual
                | Self::NotEqual
        )
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "identifier '{name}'"),
            Self::Integer(value) => write!(f, "integer {value}"),
            Self::Float(value) => write!(f, "float {value:?}"),
            Self::String(_) => f.write_str("string literal"),
            Self::Def => f.write_str("'def'"),
            Self::Return => f.write_str("'return'"),
            Self::If => f.write_str("'if'"),
            Self::Elif => f.write_str("'elif'"),
            Self::Else => f.write_str("'else'"),
            Self::While => f.write_str("'while'"),
            Self::For => f.write_str("'for'"),
            Self::In => f.write_str("'in'"),
            Self::Pass => f.write_str("'pass'"),
            Self::Equal => f.write_str("'='"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::Less => f.write_str("'<'"),
            Self::Greater => f.write_str("'>'"),
            Self::LessEqual => f.write_str("'<='"),
            Self::GreaterEqual => f.write_str("'>='"),
            Self::EqualEqual => f.write_str("'=='"),
            Self::NotEqual => f.write_str("'!='"),
            Self::Colon => f.write_str("':'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Newline => f.write_str("newline"),
            Self::Indent => f.write_str("indent"),
            Self::Dedent => f.write_str("dedent"),
            Self::EOF => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }
}
