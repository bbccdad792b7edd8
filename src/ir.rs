//! The linear three-address IR produced by [`crate::irgen`] and consumed
//! by [`crate::codegen`]. A flat, immutable sequence of instructions with
//! labels and conditional jumps in place of the AST's nested control
//! flow.

use crate::location::SourceLocation;
use crate::types::Type;
use std::fmt;

/// A symbolic value location: a fresh temporary (`x1`, `x2`, ...), a
/// builtin/operator reference (`+`, `print_int`, ...), or the fixed
/// `unit` variable. Distinguished only by name; callers look the name up
/// in a side table to find its [`Type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IrVar(pub String);

impl IrVar {
    pub fn new(name: impl Into<String>) -> Self {
        IrVar(name.into())
    }

    pub fn unit() -> Self {
        IrVar::new("unit")
    }
}

impl fmt::Display for IrVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    LoadIntConstant {
        location: SourceLocation,
        value: i64,
        dest: IrVar,
    },
    LoadBoolConstant {
        location: SourceLocation,
        value: bool,
        dest: IrVar,
    },
    Copy {
        location: SourceLocation,
        source: IrVar,
        dest: IrVar,
    },
    Call {
        location: SourceLocation,
        fun: IrVar,
        args: Vec<IrVar>,
        dest: IrVar,
    },
    Label {
        location: SourceLocation,
        name: Label,
    },
    Jump {
        location: SourceLocation,
        label: Label,
    },
    CondJump {
        location: SourceLocation,
        cond: IrVar,
        then_label: Label,
        else_label: Label,
    },
}

impl Instruction {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Instruction::LoadIntConstant { location, .. }
            | Instruction::LoadBoolConstant { location, .. }
            | Instruction::Copy { location, .. }
            | Instruction::Call { location, .. }
            | Instruction::Label { location, .. }
            | Instruction::Jump { location, .. }
            | Instruction::CondJump { location, .. } => location,
        }
    }

    /// All `IrVar`s this instruction mentions, used by the assembly
    /// generator to assign every variable a stack slot in first-seen
    /// order before any code is emitted.
    pub fn referenced_vars(&self) -> Vec<&IrVar> {
        match self {
            Instruction::LoadIntConstant { dest, .. } => vec![dest],
            Instruction::LoadBoolConstant { dest, .. } => vec![dest],
            Instruction::Copy { source, dest, .. } => vec![source, dest],
            Instruction::Call { fun, args, dest, .. } => {
                let mut vars = vec![fun];
                vars.extend(args.iter());
                vars.push(dest);
                vars
            }
            Instruction::Label { .. } | Instruction::Jump { .. } => vec![],
            Instruction::CondJump { cond, .. } => vec![cond],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadIntConstant { value, dest, .. } => {
                write!(f, "LoadIntConstant({value}, {dest})")
            }
            Instruction::LoadBoolConstant { value, dest, .. } => {
                write!(f, "LoadBoolConstant({value}, {dest})")
            }
            Instruction::Copy { source, dest, .. } => write!(f, "Copy({source}, {dest})"),
            Instruction::Call { fun, args, dest, .. } => {
                let args = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Call({fun}, [{args}], {dest})")
            }
            Instruction::Label { name, .. } => write!(f, "Label({name})"),
            Instruction::Jump { label, .. } => write!(f, "Jump({label})"),
            Instruction::CondJump {
                cond,
                then_label,
                else_label,
                ..
            } => write!(f, "CondJump({cond}, {then_label}, {else_label})"),
        }
    }
}

/// Per-variable type information produced alongside the instruction
/// sequence. The assembly generator doesn't need it (every slot is 8
/// bytes regardless of type), but it keeps the IR generator's invariant —
/// every `IrVar` it creates has a known `Type` — checkable after the
/// fact, and a future optimization pass would need it.
pub type VarTypes = std::collections::HashMap<IrVar, Type>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_constructor_style() {
        let loc = SourceLocation::sentinel();
        let ins = Instruction::LoadIntConstant {
            location: loc,
            value: 3,
            dest: IrVar::new("x1"),
        };
        assert_eq!(ins.to_string(), "LoadIntConstant(3, x1)");
    }

    #[test]
    fn referenced_vars_covers_call_fun_args_and_dest() {
        let loc = SourceLocation::sentinel();
        let ins = Instruction::Call {
            location: loc,
            fun: IrVar::new("+"),
            args: vec![IrVar::new("x1"), IrVar::new("x2")],
            dest: IrVar::new("x3"),
        };
        let names: Vec<&str> = ins.referenced_vars().iter().map(|v| v.0.as_str()).collect();
        assert_eq!(names, vec!["+", "x1", "x2", "x3"]);
    }
}
