//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the program AST.
//! - `ast` holds the tree types and an indented debug dump.
//! - `layout` assigns frame offsets to each function's parameters and locals.
//! - `codegen` lowers the AST into assembly text held by an `emit::Emitter`.
//! - `error` centralises the diagnostics shared by the other modules.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod emit;
pub mod error;
pub mod layout;
pub mod parser;
pub mod tokenizer;
pub mod ty;

pub use config::Options;
pub use emit::Assembly;
pub use error::{CompileError, CompileResult};

/// Compile a source string into an assembly artifact.
pub fn compile(source: &str, options: &Options) -> CompileResult<Assembly> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse(tokens)?;
  codegen::generate(&program, options)
}
