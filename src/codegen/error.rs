use std::fmt;

use thiserror::Error;

/// Where in the tree the generator met a node it could not translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Root,
    Statement,
    Expression,
    AssignTarget,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Statement => "statement",
            Self::Expression => "expression",
            Self::AssignTarget => "assignment target",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Unsupported construct '{kind}' in {position} position")]
    UnsupportedConstruct { kind: String, position: Position },
}

impl CodegenError {
    pub(crate) fn unsupported(kind: impl Into<String>, position: Position) -> Self {
        Self::UnsupportedConstruct {
            kind: kind.into(),
            position,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::UnsupportedConstruct { kind, .. } => kind,
        }
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;
