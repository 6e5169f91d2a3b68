//! Single pass compiler for the C0 language.
//!
//! Source text is tokenized, checked and turned into stack machine
//! instructions in one traversal. The result is a [`program::Program`]: the
//! Global Directory plus one [`function::FunctionRecord`] per function.
//!
//! ```
//! let program = c0_compiler::compile("fn main() -> int { return 1 + 2; }").unwrap();
//! assert_eq!(program.functions.len(), 2);
//! ```
use compiler::{CompileOptions, error::CompileError};
use program::Program;

/// Library functions.
pub mod builtins;
/// Compiler.
pub mod compiler;
/// Function records.
pub mod function;
/// Instructions.
pub mod instruction;
/// Compiled programs and the Global Directory.
pub mod program;
/// Value types.
pub mod val;

/// Compiles `source` with the default [`CompileOptions`].
pub fn compile(source: &str) -> Result<Program, CompileError> {
    compiler::compile_program(source, CompileOptions::default())
}
