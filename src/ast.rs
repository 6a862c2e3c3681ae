//! Syntax tree consumed by the code generator.
//!
//! A frontend builds these nodes once; the generator walks them read-only in a
//! single pass. The variant set is closed: anything a frontend recognises but
//! the generator does not model is carried as [`Node::Unsupported`] so it can be
//! reported instead of silently dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node")]
pub enum Node {
    Module {
        body: Vec<Node>,
    },
    FunctionDef {
        name: String,
        /// Parsed formal parameters (`Arg` nodes). Not emitted.
        #[serde(default)]
        args: Vec<Node>,
        body: Vec<Node>,
    },
    Expr {
        value: Box<Node>,
    },
    Call {
        func: String,
        #[serde(default)]
        args: Vec<Node>,
    },
    Assign {
        targets: Vec<Node>,
        value: Box<Node>,
    },
    Constant {
        value: Literal,
    },
    If {
        test: Box<Node>,
        body: Vec<Node>,
        #[serde(default)]
        orelse: Vec<Node>,
    },
    While {
        test: Box<Node>,
        body: Vec<Node>,
    },
    For {
        target: String,
        iter: Box<Node>,
        body: Vec<Node>,
    },
    Return {
        #[serde(default)]
        value: Option<Box<Node>>,
    },
    BinOp {
        left: Box<Node>,
        op: Operator,
        right: Box<Node>,
    },
    Name {
        id: String,
    },
    Arg {
        arg: String,
    },
    /// A construct outside the translatable subset, named by its source kind
    /// (`ListComp`, `Compare`, ...).
    Unsupported {
        kind: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Div => "/",
        }
    }
}

impl Node {
    /// Source-level name of this node's kind, used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Self::Module { .. } => "Module",
            Self::FunctionDef { .. } => "FunctionDef",
            Self::Expr { .. } => "Expr",
            Self::Call { .. } => "Call",
            Self::Assign { .. } => "Assign",
            Self::Constant { .. } => "Constant",
            Self::If { .. } => "If",
            Self::While { .. } => "While",
            Self::For { .. } => "For",
            Self::Return { .. } => "Return",
            Self::BinOp { .. } => "BinOp",
            Self::Name { .. } => "Name",
            Self::Arg { .. } => "Arg",
            Self::Unsupported { kind } => kind.as_str(),
        }
    }

    pub fn name(id: impl Into<String>) -> Self {
        Self::Name { id: id.into() }
    }

    pub fn constant(value: impl Into<Literal>) -> Self {
        Self::Constant {
            value: value.into(),
        }
    }

    pub fn call(func: impl Into<String>, args: Vec<Node>) -> Self {
        Self::Call {
            func: func.into(),
            args,
        }
    }

    pub fn expr(value: Node) -> Self {
        Self::Expr {
            value: Box::new(value),
        }
    }

    pub fn bin_op(left: Node, op: Operator, right: Node) -> Self {
        Self::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::Unsupported { kind: kind.into() }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for Literal {
    /// Renders the literal as C source text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            // Debug keeps the fractional part (`1.0`, not `1`).
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Str(value) => write!(f, "\"{}\"", escape_c_string(value)),
        }
    }
}

pub fn escape_c_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            // Fixed-width octal per UTF-8 byte, so a following digit is not absorbed.
            _ if ch.is_control() => {
                let mut buffer = [0; 4];
                for byte in ch.encode_utf8(&mut buffer).bytes() {
                    escaped.push_str(&format!("\\{byte:03o}"));
                }
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_literals_as_c() {
        assert_eq!(Literal::Int(42).to_string(), "42");
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::Float(2.5).to_string(), "2.5");
        assert_eq!(
            Literal::from("say \"hi\"\n").to_string(),
            r#""say \"hi\"\n""#
        );
    }

    #[test]
    fn escapes_control_characters_as_octal() {
        assert_eq!(escape_c_string("\0"), r"\000");
        assert_eq!(escape_c_string("A\x07A"), r"A\007A");
        assert_eq!(escape_c_string("\x1b[0m"), r"\033[0m");
        assert_eq!(escape_c_string("\u{85}1"), r"\302\2051");
        assert_eq!(escape_c_string("caf\u{e9}"), "caf\u{e9}");
    }

    #[test]
    fn unsupported_nodes_report_their_source_kind() {
        assert_eq!(Node::unsupported("ListComp").kind(), "ListComp");
        assert_eq!(Node::name("x").kind(), "Name");
    }

    #[test]
    fn deserializes_tagged_json() {
        let json = r#"{
            "node": "Module",
            "body": [
                {"node": "Assign",
                 "targets": [{"node": "Name", "id": "x"}],
                 "value": {"node": "Constant", "value": 1.5}},
                {"node": "Return"}
            ]
        }"#;
        let module: Node = serde_json::from_str(json).expect("valid AST json");
        assert_eq!(
            module,
            Node::Module {
                body: vec![
                    Node::Assign {
                        targets: vec![Node::name("x")],
                        value: Box::new(Node::constant(1.5)),
                    },
                    Node::Return { value: None },
                ],
            }
        );
    }
}
