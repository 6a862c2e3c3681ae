use anyhow::Result;

use crate::ast::Node;

/// A whole-tree transformation run before code generation.
///
/// Passes take ownership of the tree and hand back a tree of the same shape,
/// so they can be chained and swapped without touching the generator.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, module: Node) -> Result<Node>;
}

/// Semantic analysis seam. Performs no checks: there is no type checking,
/// name resolution or declaration tracking.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticAnalysis;

impl Pass for SemanticAnalysis {
    fn name(&self) -> &'static str {
        "semantic-analysis"
    }

    fn run(&self, module: Node) -> Result<Node> {
        Ok(module)
    }
}

/// Optimization seam. Returns the tree unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer;

impl Pass for Optimizer {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn run(&self, module: Node) -> Result<Node> {
        Ok(module)
    }
}

pub fn default_passes() -> Vec<Box<dyn Pass>> {
    vec![Box::new(SemanticAnalysis), Box::new(Optimizer)]
}
