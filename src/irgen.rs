//! Lowers a type-checked AST into the linear three-address IR consumed
//! by the assembly generator. Owns two fresh-name counters (`x1…`
//! temporaries, `L1…` labels),
//! a [`VarTypes`] side table, and a [`Scope`] of [`IrVar`] bindings
//! seeded with the same built-in names the type checker's symbol table
//! uses, each carrying an `IrVar` instead of a `Type`.

use crate::ast::{Expression, LiteralValue, Node};
use crate::error::IrError;
use crate::ir::{Instruction, IrVar, Label, VarTypes};
use crate::scope::Scope;
use crate::types::Type;

fn seed_scope() -> (Scope<IrVar>, VarTypes) {
    let mut scope = Scope::new();
    let mut var_types = VarTypes::new();
    let mut bind = |scope: &mut Scope<IrVar>, name: &str, ty: Type| {
        scope.set(name, IrVar::new(name));
        var_types.insert(IrVar::new(name), ty);
    };
    bind(&mut scope, "+", Type::fun([Type::Int, Type::Int], Type::Int));
    bind(&mut scope, "-", Type::fun([Type::Int, Type::Int], Type::Int));
    bind(&mut scope, "*", Type::fun([Type::Int, Type::Int], Type::Int));
    bind(&mut scope, "/", Type::fun([Type::Int, Type::Int], Type::Int));
    bind(&mut scope, "%", Type::fun([Type::Int, Type::Int], Type::Int));
    bind(&mut scope, "<", Type::fun([Type::Int, Type::Int], Type::Bool));
    bind(&mut scope, "<=", Type::fun([Type::Int, Type::Int], Type::Bool));
    bind(&mut scope, ">", Type::fun([Type::Int, Type::Int], Type::Bool));
    bind(&mut scope, ">=", Type::fun([Type::Int, Type::Int], Type::Bool));
    bind(&mut scope, "unary_-", Type::fun([Type::Int], Type::Int));
    bind(&mut scope, "unary_not", Type::fun([Type::Bool], Type::Bool));
    bind(&mut scope, "print_int", Type::fun([Type::Int], Type::Unit));
    bind(&mut scope, "print_bool", Type::fun([Type::Bool], Type::Unit));
    bind(&mut scope, "read_int", Type::fun([], Type::Int));
    (scope, var_types)
}

pub struct IrGenerator {
    instructions: Vec<Instruction>,
    var_types: VarTypes,
    scope: Scope<IrVar>,
    next_var: usize,
    next_label: usize,
}

impl IrGenerator {
    pub fn new() -> Self {
        let (scope, var_types) = seed_scope();
        IrGenerator {
            instructions: Vec::new(),
            var_types,
            scope,
            next_var: 1,
            next_label: 1,
        }
    }

    fn new_var(&mut self, ty: Type) -> IrVar {
        let var = IrVar::new(format!("x{}", self.next_var));
        self.next_var += 1;
        self.var_types.insert(var.clone(), ty);
        var
    }

    fn new_label(&mut self) -> Label {
        let label = Label(format!("L{}", self.next_label));
        self.next_label += 1;
        label
    }

    /// Lowers the typed root expression, then appends a call to
    /// `print_int`/`print_bool` on the root's value if its type is `Int`
    /// or `Bool`, so the compiled program's observable output matches
    /// the interpreter printing the top-level value.
    pub fn generate(mut self, root: &Node) -> Result<(Vec<Instruction>, VarTypes), IrError> {
        let result = self.visit(root)?;
        match &root.type_ {
            Type::Int => {
                let dest = self.new_var(Type::Unit);
                self.instructions.push(Instruction::Call {
                    location: root.location.clone(),
                    fun: IrVar::new("print_int"),
                    args: vec![result],
                    dest,
                });
            }
            Type::Bool => {
                let dest = self.new_var(Type::Unit);
                self.instructions.push(Instruction::Call {
                    location: root.location.clone(),
                    fun: IrVar::new("print_bool"),
                    args: vec![result],
                    dest,
                });
            }
            Type::Unit | Type::Fun(..) => {}
        }
        Ok((self.instructions, self.var_types))
    }

    fn visit(&mut self, node: &Node) -> Result<IrVar, IrError> {
        let location = node.location.clone();
        match &node.expr {
            Expression::Literal(LiteralValue::Int(value)) => {
                let dest = self.new_var(Type::Int);
                self.instructions.push(Instruction::LoadIntConstant {
                    location,
                    value: *value,
                    dest: dest.clone(),
                });
                Ok(dest)
            }
            Expression::Literal(LiteralValue::Bool(value)) => {
                let dest = self.new_var(Type::Bool);
                self.instructions.push(Instruction::LoadBoolConstant {
                    location,
                    value: *value,
                    dest: dest.clone(),
                });
                Ok(dest)
            }
            Expression::Literal(LiteralValue::Unit) => Ok(IrVar::unit()),

            Expression::Identifier(name) => {
                self.scope.get(name).cloned().ok_or_else(|| IrError::Invariant {
                    location,
                    message: format!("unbound identifier '{name}' reached IR generation"),
                })
            }

            Expression::BinaryOp { left, op, right } if op == "=" => {
                let value = self.visit(right)?;
                let name = match &left.expr {
                    Expression::Identifier(name) => name,
                    _ => {
                        return Err(IrError::Invariant {
                            location,
                            message: "assignment target was not an identifier".to_string(),
                        })
                    }
                };
                let dest = self.scope.get(name).cloned().ok_or_else(|| IrError::Invariant {
                    location: location.clone(),
                    message: format!("unbound identifier '{name}' in assignment"),
                })?;
                self.instructions.push(Instruction::Copy {
                    location,
                    source: value,
                    dest: dest.clone(),
                });
                Ok(dest)
            }

            Expression::BinaryOp { left, op, right } if op == "and" => {
                let l_right = self.new_label();
                let l_skip = self.new_label();
                let l_end = self.new_label();
                let result = self.new_var(Type::Bool);

                let left_var = self.visit(left)?;
                self.instructions.push(Instruction::CondJump {
                    location: location.clone(),
                    cond: left_var,
                    then_label: l_right.clone(),
                    else_label: l_skip.clone(),
                });

                self.emit_label(location.clone(), l_right);
                let right_var = self.visit(right)?;
                self.instructions.push(Instruction::Copy {
                    location: location.clone(),
                    source: right_var,
                    dest: result.clone(),
                });
                self.instructions.push(Instruction::Jump {
                    location: location.clone(),
                    label: l_end.clone(),
                });

                self.emit_label(location.clone(), l_skip);
                self.instructions.push(Instruction::LoadBoolConstant {
                    location: location.clone(),
                    value: false,
                    dest: result.clone(),
                });
                self.instructions.push(Instruction::Jump {
                    location: location.clone(),
                    label: l_end.clone(),
                });

                self.emit_label(location, l_end);
                Ok(result)
            }

            Expression::BinaryOp { left, op, right } if op == "or" => {
                let l_right = self.new_label();
                let l_skip = self.new_label();
                let l_end = self.new_label();
                let result = self.new_var(Type::Bool);

                let left_var = self.visit(left)?;
                self.instructions.push(Instruction::CondJump {
                    location: location.clone(),
                    cond: left_var,
                    then_label: l_skip.clone(),
                    else_label: l_right.clone(),
                });

                self.emit_label(location.clone(), l_skip);
                self.instructions.push(Instruction::LoadBoolConstant {
                    location: location.clone(),
                    value: true,
                    dest: result.clone(),
                });
                self.instructions.push(Instruction::Jump {
                    location: location.clone(),
                    label: l_end.clone(),
                });

                self.emit_label(location.clone(), l_right);
                let right_var = self.visit(right)?;
                self.instructions.push(Instruction::Copy {
                    location: location.clone(),
                    source: right_var,
                    dest: result.clone(),
                });
                self.instructions.push(Instruction::Jump {
                    location: location.clone(),
                    label: l_end.clone(),
                });

                self.emit_label(location, l_end);
                Ok(result)
            }

            Expression::BinaryOp { left, op, right } => {
                let left_var = self.visit(left)?;
                let right_var = self.visit(right)?;
                let op_var = self.scope.get(op).cloned().unwrap_or_else(|| IrVar::new(op.as_str()));
                let dest = self.new_var(node.type_.clone());
                self.instructions.push(Instruction::Call {
                    location,
                    fun: op_var,
                    args: vec![left_var, right_var],
                    dest: dest.clone(),
                });
                Ok(dest)
            }

            Expression::UnaryOp { op, expr } => {
                let operand = self.visit(expr)?;
                let key = format!("unary_{op}");
                let op_var = self
                    .scope
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| IrVar::new(key));
                let dest = self.new_var(node.type_.clone());
                self.instructions.push(Instruction::Call {
                    location,
                    fun: op_var,
                    args: vec![operand],
                    dest: dest.clone(),
                });
                Ok(dest)
            }

            Expression::IfExpression {
                cond,
                then_clause,
                else_clause: None,
            } => {
                let l_then = self.new_label();
                let l_end = self.new_label();

                let cond_var = self.visit(cond)?;
                self.instructions.push(Instruction::CondJump {
                    location: location.clone(),
                    cond: cond_var,
                    then_label: l_then.clone(),
                    else_label: l_end.clone(),
                });

                self.emit_label(location.clone(), l_then);
                self.visit(then_clause)?;

                self.emit_label(location, l_end);
                Ok(IrVar::unit())
            }

            Expression::IfExpression {
                cond,
                then_clause,
                else_clause: Some(else_clause),
            } => {
                let l_then = self.new_label();
                let l_else = self.new_label();
                let l_end = self.new_label();

                let cond_var = self.visit(cond)?;
                self.instructions.push(Instruction::CondJump {
                    location: location.clone(),
                    cond: cond_var,
                    then_label: l_then.clone(),
                    else_label: l_else.clone(),
                });

                self.emit_label(location.clone(), l_then);
                let result = self.visit(then_clause)?;
                self.instructions.push(Instruction::Jump {
                    location: location.clone(),
                    label: l_end.clone(),
                });

                self.emit_label(location.clone(), l_else);
                let else_result = self.visit(else_clause)?;
                self.instructions.push(Instruction::Copy {
                    location: location.clone(),
                    source: else_result,
                    dest: result.clone(),
                });

                self.emit_label(location, l_end);
                Ok(result)
            }

            Expression::WhileExpression { cond, do_clause } => {
                let l_start = self.new_label();
                let l_body = self.new_label();
                let l_end = self.new_label();

                self.emit_label(location.clone(), l_start.clone());
                let cond_var = self.visit(cond)?;
                self.instructions.push(Instruction::CondJump {
                    location: location.clone(),
                    cond: cond_var,
                    then_label: l_body.clone(),
                    else_label: l_end.clone(),
                });

                self.emit_label(location.clone(), l_body);
                self.visit(do_clause)?;
                self.instructions.push(Instruction::Jump {
                    location: location.clone(),
                    label: l_start,
                });

                self.emit_label(location, l_end);
                Ok(IrVar::unit())
            }

            Expression::VarDeclaration { name, value, .. } => {
                let value_var = self.visit(value)?;
                let slot = self.new_var(value.type_.clone());
                self.instructions.push(Instruction::Copy {
                    location,
                    source: value_var,
                    dest: slot.clone(),
                });
                self.scope.set(name.clone(), slot);
                Ok(IrVar::unit())
            }

            Expression::Block(statements) => {
                self.scope.push();
                let mut result = IrVar::unit();
                for statement in statements {
                    match self.visit(statement) {
                        Ok(var) => result = var,
                        Err(e) => {
                            self.scope.pop();
                            return Err(e);
                        }
                    }
                }
                self.scope.pop();
                Ok(result)
            }

            Expression::FunctionCall { name, arguments } => {
                let fun = self.scope.get(name).cloned().ok_or_else(|| IrError::Invariant {
                    location: location.clone(),
                    message: format!("unbound function '{name}' reached IR generation"),
                })?;
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.visit(arg)?);
                }
                let dest = self.new_var(node.type_.clone());
                self.instructions.push(Instruction::Call {
                    location,
                    fun,
                    args,
                    dest: dest.clone(),
                });
                Ok(dest)
            }
        }
    }

    fn emit_label(&mut self, location: crate::location::SourceLocation, name: Label) {
        self.instructions.push(Instruction::Label { location, name });
    }
}

impl Default for IrGenerator {
    fn default() -> Self {
        IrGenerator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::typechecker::TypeChecker;

    fn lower(src: &str) -> Vec<Instruction> {
        let mut node = parse(src, "t").unwrap();
        TypeChecker::new().check(&mut node).unwrap();
        IrGenerator::new().generate(&node).unwrap().0
    }

    #[test]
    fn int_literal_appends_print_int() {
        let ins = lower("1 + 2");
        assert!(matches!(ins.last().unwrap(), Instruction::Call { fun, .. } if fun.0 == "print_int"));
    }

    #[test]
    fn bool_result_appends_print_bool() {
        let ins = lower("true");
        assert!(matches!(ins.last().unwrap(), Instruction::Call { fun, .. } if fun.0 == "print_bool"));
    }

    #[test]
    fn unit_result_has_no_trailing_print_call() {
        let ins = lower("var x = 1");
        assert!(!matches!(ins.last().unwrap(), Instruction::Call { fun, .. } if fun.0.starts_with("print")));
    }

    #[test]
    fn and_short_circuits_with_three_labels() {
        let ins = lower("false and true");
        let labels: usize = ins
            .iter()
            .filter(|i| matches!(i, Instruction::Label { .. }))
            .count();
        assert_eq!(labels, 3);
    }

    #[test]
    fn while_loop_has_start_body_and_end_labels() {
        let ins = lower("var i = 0; while i < 3 do i = i + 1");
        let labels: usize = ins
            .iter()
            .filter(|i| matches!(i, Instruction::Label { .. }))
            .count();
        assert_eq!(labels, 3);
    }

    #[test]
    fn assignment_emits_a_copy_into_the_existing_slot() {
        let ins = lower("var x = 1; x = 2");
        let copies: usize = ins
            .iter()
            .filter(|i| matches!(i, Instruction::Copy { .. }))
            .count();
        assert!(copies >= 2);
    }
}
