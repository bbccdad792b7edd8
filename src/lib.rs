//! Compiler for a small, statically-typed, expression-oriented
//! language, targeting x86-64 GNU assembly.
//!
//! The pipeline is a straight line: [`tokenize`](token::tokenize) →
//! [`parse`](parser::parse) → [`TypeChecker::check`](typechecker::TypeChecker::check)
//! → [`IrGenerator::generate`](irgen::IrGenerator::generate) →
//! [`codegen::generate`]. Each stage takes ownership of its input and
//! returns a fresh output, except the type checker, which annotates the
//! AST it is given in place. The first error from any stage aborts the
//! whole compile; no stage attempts recovery.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod interpreter;
pub mod ir;
pub mod irgen;
pub mod location;
pub mod parser;
pub mod scope;
pub mod token;
pub mod typechecker;
pub mod types;

pub use ast::Node;
pub use error::CompileError;
pub use interpreter::{Interpreter, RuntimeError, Value};
pub use ir::Instruction;
pub use types::Type;

use std::io::BufRead;

/// Parses and type-checks `source`, returning the annotated AST.
pub fn check(source: &str, file: &str) -> Result<Node, CompileError> {
    let mut node = parser::parse(source, file)?;
    typechecker::TypeChecker::new().check(&mut node)?;
    Ok(node)
}

/// Compiles `source` all the way to x86-64 assembly text.
pub fn compile(source: &str, file: &str) -> Result<String, CompileError> {
    let node = check(source, file)?;
    let (instructions, _var_types) = irgen::IrGenerator::new().generate(&node)?;
    let assembly = codegen::generate(&instructions)?;
    Ok(assembly)
}

/// Type-checks and lowers `source` to IR, returning it rendered one
/// instruction per line in the format `Display` produces for each
/// variant (e.g. `LoadIntConstant(3, x1)`).
pub fn emit_ir(source: &str, file: &str) -> Result<String, CompileError> {
    let node = check(source, file)?;
    let (instructions, _var_types) = irgen::IrGenerator::new().generate(&node)?;
    let mut out = String::new();
    for ins in &instructions {
        out.push_str(&ins.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Error from [`interpret`]: either the program failed to check, or it
/// checked fine and faulted while running (e.g. division by zero).
#[derive(Debug)]
pub enum RunError {
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Compile(e) => write!(f, "{e}"),
            RunError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<CompileError> for RunError {
    fn from(e: CompileError) -> Self {
        RunError::Compile(e)
    }
}

impl From<RuntimeError> for RunError {
    fn from(e: RuntimeError) -> Self {
        RunError::Runtime(e)
    }
}

/// Type-checks `source` and evaluates it with the reference
/// interpreter, reading `read_int` calls from `input`.
pub fn interpret<R: BufRead>(source: &str, file: &str, input: R) -> Result<String, RunError> {
    let node = check(source, file)?;
    let output = Interpreter::new(input).run(&node)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn compile_emits_prologue_and_intrinsic_body() {
        let asm = compile("1 + 2", "t").unwrap();
        assert!(asm.contains("main:"));
        assert!(asm.contains("addq"));
    }

    #[test]
    fn compile_surfaces_type_errors() {
        assert!(compile("true + 1", "t").is_err());
    }

    #[test]
    fn emit_ir_renders_one_instruction_per_line() {
        let ir = emit_ir("1 + 2", "t").unwrap();
        assert!(ir.lines().any(|l| l.starts_with("LoadIntConstant")));
        assert!(ir.lines().any(|l| l.starts_with("Call(+")));
    }

    #[test]
    fn interpret_matches_compiled_output_shape() {
        let out = interpret("1 + 2", "t", Cursor::new(Vec::new())).unwrap();
        assert_eq!(out, "3\n");
    }
}
