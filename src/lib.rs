pub mod ast;
pub mod codegen;
pub mod frontend;
pub mod passes;
pub mod translator;

pub use ast::{Literal, Node, Operator};
pub use codegen::{CodeGenerator, CodegenError, CodegenOptions};
pub use translator::Translator;
