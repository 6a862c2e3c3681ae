use anyhow::{Context, Result};
use log::debug;

use crate::ast::Node;
use crate::codegen::{CodeGenerator, CodegenOptions};
use crate::frontend;
use crate::passes::{Pass, default_passes};

/// Runs the passes and then the generator over one tree.
pub struct Translator {
    passes: Vec<Box<dyn Pass>>,
    generator: CodeGenerator,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::with_options(CodegenOptions::default())
    }

    pub fn with_options(options: CodegenOptions) -> Self {
        Self {
            passes: default_passes(),
            generator: CodeGenerator::with_options(options),
        }
    }

    /// Appends `pass` after the ones already registered.
    pub fn with_pass(mut self, pass: Box<dyn Pass>) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }

    pub fn run_passes(&self, module: Node) -> Result<Node> {
        let mut module = module;
        for pass in &self.passes {
            debug!("running pass {}", pass.name());
            module = pass
                .run(module)
                .with_context(|| format!("Pass {} failed", pass.name()))?;
        }
        Ok(module)
    }

    pub fn translate(&self, module: Node) -> Result<String> {
        let module = self.run_passes(module)?;
        let output = self.generator.generate(&module)?;
        Ok(output)
    }

    /// Parses `source` and translates the resulting module.
    pub fn compile(&self, source: &str) -> Result<String> {
        let module = frontend::parse(source).context("Parsing source")?;
        self.translate(module)
    }
}
