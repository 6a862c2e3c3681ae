use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrontendError {
    #[error("Invalid dedent to {indent_level} spaces at line {line}, column {column}")]
    InvalidDedent {
        indent_level: usize,
        line: usize,
        column: usize,
    },
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Inconsistent use of tabs and spaces in indentation at line {line}, column {column}")]
    InconsistentTabs { line: usize, column: usize },
    #[error("Invalid number literal '{literal}' at line {line}, column {column}")]
    InvalidNumberLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("Invalid escape '{escape}' in string literal at line {line}, column {column}")]
    InvalidEscape {
        escape: String,
        line: usize,
        column: usize,
    },
    #[error("Expected {expected}, got {found} at line {line}, column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
}

pub type FrontendResult<T> = Result<T, FrontendError>;
