//! Vue template compiler.
//!
//! Parses Vue 2 template syntax into an AST, normalizes conditionals and
//! slot content, and generates the body of a render function that the Vue
//! runtime can evaluate with the component instance as `this`.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod transforms;

pub use ast::*;
pub use codegen::generate;
pub use error::{CompileError, CompileErrorCode, CompileResult};
pub use parser::parse_template;

/// Output of a successful template compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Render function body, `with(this){return ...}`.
    pub render: String,
}

/// Compile a Vue template to a render function body.
pub fn compile(source: &str) -> CompileResult<CompiledTemplate> {
    let mut ast = parse_template(source)?;
    transforms::transform(&mut ast)?;
    let render = generate(&ast)?;
    Ok(CompiledTemplate { render })
}
