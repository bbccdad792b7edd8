//! One error taxonomy per pipeline stage, all fatal, all located.
//!
//! Follows the hand-rolled enum + manual `Display`/`Error` impl pattern
//! the codegen stage uses (no `thiserror`/`anyhow` in this codebase):
//! a plain enum of variants, a `Display` that renders a human message,
//! and `From` impls so `?` can cross stage boundaries into the
//! top-level [`CompileError`].

use crate::location::SourceLocation;
use std::fmt;

#[derive(Debug)]
pub enum LexError {
    UnexpectedCharacter {
        location: SourceLocation,
        character: char,
    },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter { location, character } => {
                write!(f, "{location}: unexpected character '{character}'")
            }
        }
    }
}

impl std::error::Error for LexError {}

#[derive(Debug)]
pub enum ParseError {
    UnexpectedToken {
        location: SourceLocation,
        expected: String,
        found: String,
    },
    VarNotAllowedHere {
        location: SourceLocation,
    },
    EmptyInput,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                location,
                expected,
                found,
            } => write!(f, "{location}: expected {expected}, got {found}"),
            ParseError::VarNotAllowedHere { location } => {
                write!(f, "{location}: 'var' is not allowed in this position")
            }
            ParseError::EmptyInput => write!(f, "input was empty"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub enum TypeError {
    UnknownName {
        location: SourceLocation,
        name: String,
    },
    Redeclaration {
        location: SourceLocation,
        name: String,
    },
    OperandMismatch {
        location: SourceLocation,
        op: String,
        expected: String,
        found: String,
    },
    ConditionNotBool {
        location: SourceLocation,
        found: String,
    },
    BranchMismatch {
        location: SourceLocation,
        then_type: String,
        else_type: String,
    },
    DeclaredTypeMismatch {
        location: SourceLocation,
        declared: String,
        inferred: String,
    },
    UnknownDeclaredType {
        location: SourceLocation,
        name: String,
    },
    AssignmentTargetNotIdentifier {
        location: SourceLocation,
    },
    ArityMismatch {
        location: SourceLocation,
        name: String,
        expected: usize,
        found: usize,
    },
    UnknownOperator {
        location: SourceLocation,
        op: String,
    },
    NotCallable {
        location: SourceLocation,
        name: String,
    },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnknownName { location, name } => {
                write!(f, "{location}: unknown name '{name}'")
            }
            TypeError::Redeclaration { location, name } => {
                write!(f, "{location}: '{name}' is already declared in this scope")
            }
            TypeError::OperandMismatch {
                location,
                op,
                expected,
                found,
            } => write!(
                f,
                "{location}: operator '{op}' expected {expected}, got {found}"
            ),
            TypeError::ConditionNotBool { location, found } => {
                write!(f, "{location}: condition must be Bool, got {found}")
            }
            TypeError::BranchMismatch {
                location,
                then_type,
                else_type,
            } => write!(
                f,
                "{location}: 'then' and 'else' have different types: {then_type} and {else_type}"
            ),
            TypeError::DeclaredTypeMismatch {
                location,
                declared,
                inferred,
            } => write!(
                f,
                "{location}: declared type {declared} does not match inferred type {inferred}"
            ),
            TypeError::UnknownDeclaredType { location, name } => {
                write!(f, "{location}: unknown type '{name}'")
            }
            TypeError::AssignmentTargetNotIdentifier { location } => {
                write!(f, "{location}: left side of assignment must be an identifier")
            }
            TypeError::ArityMismatch {
                location,
                name,
                expected,
                found,
            } => write!(
                f,
                "{location}: '{name}' expects {expected} argument(s), got {found}"
            ),
            TypeError::UnknownOperator { location, op } => {
                write!(f, "{location}: unknown operator '{op}'")
            }
            TypeError::NotCallable { location, name } => {
                write!(f, "{location}: '{name}' is not callable")
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// Defensive: conditions the type checker should have already rejected.
/// Reaching one of these means a well-typed program slipped an invariant
/// past the checker, which is a bug in this compiler rather than in the
/// source program.
#[derive(Debug)]
pub enum IrError {
    Invariant {
        location: SourceLocation,
        message: String,
    },
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrError::Invariant { location, message } => {
                write!(f, "{location}: internal error: {message}")
            }
        }
    }
}

impl std::error::Error for IrError {}

#[derive(Debug)]
pub enum CodegenError {
    UnhandledInstruction {
        location: SourceLocation,
        message: String,
    },
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::UnhandledInstruction { location, message } => {
                write!(f, "{location}: code generation error: {message}")
            }
        }
    }
}

impl std::error::Error for CodegenError {}

/// Unified pipeline error. The first error from any stage aborts the
/// whole compile; no stage attempts recovery.
#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Type(TypeError),
    Ir(IrError),
    Codegen(CodegenError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "{e}"),
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Type(e) => write!(f, "{e}"),
            CompileError::Ir(e) => write!(f, "{e}"),
            CompileError::Codegen(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<TypeError> for CompileError {
    fn from(e: TypeError) -> Self {
        CompileError::Type(e)
    }
}

impl From<IrError> for CompileError {
    fn from(e: IrError) -> Self {
        CompileError::Ir(e)
    }
}

impl From<CodegenError> for CompileError {
    fn from(e: CodegenError) -> Self {
        CompileError::Codegen(e)
    }
}
