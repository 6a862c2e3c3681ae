//! C code generation over the [`Node`] tree.
//!
//! Statement-kind nodes go through [`CodeGenerator::emit_statement`], which
//! appends lines to the output and yields nothing. Expression-kind nodes go
//! through [`CodeGenerator::eval_expression`], which returns their C text and
//! has no access to the output buffer at all. A node reaching the wrong one of
//! the two is an unsupported construct.

use log::{debug, trace};

use crate::ast::{Node, Operator};

pub use self::error::{CodegenError, CodegenResult, Position};

mod error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// One level of indentation.
    pub indent: String,
    /// First line of every translation.
    pub prelude: String,
    /// Return type written in front of every function definition.
    pub return_type: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            prelude: "#include <stdio.h>".to_string(),
            return_type: "void".to_string(),
        }
    }
}

impl CodegenOptions {
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent = " ".repeat(width);
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }
}

/// Translates a `Module` tree into C.
///
/// The generator itself holds only options; every run gets its own buffer and
/// depth counter, so one instance can serve many translations, including from
/// several threads at once.
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    options: CodegenOptions,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CodegenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    pub fn generate(&self, root: &Node) -> CodegenResult<String> {
        let mut output = String::new();
        self.generate_into(root, &mut output)?;
        Ok(output)
    }

    /// Appends the translation of `root` to `output`.
    ///
    /// On failure `output` holds whatever was emitted before the offending
    /// node. That text is for diagnostics only and is not a valid program.
    pub fn generate_into(&self, root: &Node, output: &mut String) -> CodegenResult<()> {
        let Node::Module { body } = root else {
            return Err(CodegenError::unsupported(root.kind(), Position::Root));
        };

        let start = output.len();
        let mut emitter = Emitter::new(output, &self.options.indent);
        emitter.line(&self.options.prelude);
        self.emit_body(body, &mut emitter)?;
        debug!(
            "generated {} bytes for {} top-level statements",
            output.len() - start,
            body.len()
        );
        Ok(())
    }

    fn emit_body(&self, body: &[Node], out: &mut Emitter<'_>) -> CodegenResult<()> {
        for statement in body {
            self.emit_statement(statement, out)?;
        }
        Ok(())
    }

    fn emit_statement(&self, node: &Node, out: &mut Emitter<'_>) -> CodegenResult<()> {
        trace!("statement {} at depth {}", node.kind(), out.depth);
        match node {
            // Parameters are parsed but never part of the emitted signature.
            Node::FunctionDef { name, body, .. } => {
                out.line(&format!("{} {name}() {{", self.options.return_type));
                out.block(|out| self.emit_body(body, out))?;
                out.line("}");
            }
            Node::Expr { value } => {
                let value = self.eval_expression(value)?;
                out.line(&format!("{value};"));
            }
            Node::Assign { targets, value } => {
                let targets = self.assign_targets(targets)?;
                let value = self.eval_expression(value)?;
                out.line(&format!("{targets} = {value};"));
            }
            Node::If { test, body, orelse } => {
                let test = self.eval_expression(test)?;
                out.line(&format!("if ({test}) {{"));
                out.block(|out| self.emit_body(body, out))?;
                out.line("}");
                if !orelse.is_empty() {
                    out.line("else {");
                    out.block(|out| self.emit_body(orelse, out))?;
                    out.line("}");
                }
            }
            Node::While { test, body } => {
                let test = self.eval_expression(test)?;
                out.line(&format!("while ({test}) {{"));
                out.block(|out| self.emit_body(body, out))?;
                out.line("}");
            }
            // `iter` is trusted to be an integer bound; nothing checks it.
            Node::For { target, iter, body } => {
                let bound = self.eval_expression(iter)?;
                out.line(&format!(
                    "for (int {target} = 0; {target} < {bound}; {target}++) {{"
                ));
                out.block(|out| self.emit_body(body, out))?;
                out.line("}");
            }
            Node::Return { value: Some(value) } => {
                let value = self.eval_expression(value)?;
                out.line(&format!("return {value};"));
            }
            Node::Return { value: None } => out.line("return;"),
            Node::Module { .. }
            | Node::Call { .. }
            | Node::Constant { .. }
            | Node::BinOp { .. }
            | Node::Name { .. }
            | Node::Arg { .. }
            | Node::Unsupported { .. } => {
                return Err(CodegenError::unsupported(node.kind(), Position::Statement));
            }
        }
        Ok(())
    }

    fn eval_expression(&self, node: &Node) -> CodegenResult<String> {
        match node {
            Node::Call { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_expression(arg))
                    .collect::<CodegenResult<Vec<_>>>()?;
                Ok(format!("{func}({})", args.join(", ")))
            }
            Node::Constant { value } => Ok(value.to_string()),
            Node::BinOp { left, op, right } => {
                let left = self.eval_operand(left, *op, Side::Left)?;
                let right = self.eval_operand(right, *op, Side::Right)?;
                Ok(format!("{left} {} {right}", op.symbol()))
            }
            Node::Name { id } => Ok(id.clone()),
            Node::Arg { arg } => Ok(arg.clone()),
            Node::Module { .. }
            | Node::FunctionDef { .. }
            | Node::Expr { .. }
            | Node::Assign { .. }
            | Node::If { .. }
            | Node::While { .. }
            | Node::For { .. }
            | Node::Return { .. }
            | Node::Unsupported { .. } => Err(CodegenError::unsupported(
                node.kind(),
                Position::Expression,
            )),
        }
    }

    /// Operands keep the grouping of the tree: a nested operation that C would
    /// otherwise bind differently is parenthesized.
    fn eval_operand(&self, operand: &Node, parent: Operator, side: Side) -> CodegenResult<String> {
        let text = self.eval_expression(operand)?;
        let Node::BinOp { op: child, .. } = operand else {
            return Ok(text);
        };
        let needs_parens = match side {
            Side::Left => child.precedence() < parent.precedence(),
            Side::Right => {
                child.precedence() < parent.precedence()
                    || (child.precedence() == parent.precedence()
                        && !(*child == parent && parent.is_associative()))
            }
        };
        Ok(if needs_parens { format!("({text})") } else { text })
    }

    fn assign_targets(&self, targets: &[Node]) -> CodegenResult<String> {
        if targets.is_empty() {
            return Err(CodegenError::unsupported(
                "Assign without targets",
                Position::AssignTarget,
            ));
        }
        let names = targets
            .iter()
            .map(|target| match target {
                Node::Name { id } => Ok(id.as_str()),
                other => Err(CodegenError::unsupported(
                    other.kind(),
                    Position::AssignTarget,
                )),
            })
            .collect::<CodegenResult<Vec<_>>>()?;
        Ok(names.join(", "))
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Operator {
    fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mult | Self::Div => 2,
        }
    }

    fn is_associative(self) -> bool {
        matches!(self, Self::Add | Self::Mult)
    }
}

/// Per-run output state: the buffer handle and the current block depth.
struct Emitter<'a> {
    output: &'a mut String,
    indent: &'a str,
    depth: usize,
}

impl<'a> Emitter<'a> {
    fn new(output: &'a mut String, indent: &'a str) -> Self {
        Self {
            output,
            indent,
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.output.push_str(self.indent);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Runs `body` one level deeper. The depth is restored even if `body`
    /// fails.
    fn block<F>(&mut self, body: F) -> CodegenResult<()>
    where
        F: FnOnce(&mut Self) -> CodegenResult<()>,
    {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }
}
