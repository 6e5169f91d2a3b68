use compiler_context::CompilerContext;
use error::CompileError;

use crate::program::Program;

mod compiler_context;
pub mod error;
mod expression;
pub mod operators;
pub mod span;
mod statement;
pub mod symbols;
pub mod tokenizer;

pub use compiler_context::ENTRY_FUNCTION;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Options that control a compilation run.
pub struct CompileOptions {
    /// The maximum nesting of blocks, conditions and parenthesized
    /// sub-expressions before compilation fails with
    /// [`error::ErrorKind::NestingTooDeep`].
    pub max_nesting_depth: u32,
}

impl Default for CompileOptions {
    fn default() -> CompileOptions {
        CompileOptions {
            max_nesting_depth: 256,
        }
    }
}

/// Compiles a whole source file into a program.
///
/// Compilation stops at the first error.
pub fn compile_program(source: &str, options: CompileOptions) -> Result<Program, CompileError> {
    CompilerContext::new(source, options).compile_program()
}
