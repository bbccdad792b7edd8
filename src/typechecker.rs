//! Static type checking. Walks the AST once, annotating each [`Node`]'s
//! `type_` field in place and threading a [`Scope`] of [`Type`] bindings
//! seeded with the arithmetic, comparison, logical, and unary operators
//! plus the three builtins.

use crate::ast::{Expression, LiteralValue, Node};
use crate::error::TypeError;
use crate::scope::Scope;
use crate::types::Type;

fn builtin_scope() -> Scope<Type> {
    let mut scope = Scope::new();
    scope.set("+", Type::fun([Type::Int, Type::Int], Type::Int));
    scope.set("-", Type::fun([Type::Int, Type::Int], Type::Int));
    scope.set("*", Type::fun([Type::Int, Type::Int], Type::Int));
    scope.set("/", Type::fun([Type::Int, Type::Int], Type::Int));
    scope.set("%", Type::fun([Type::Int, Type::Int], Type::Int));
    scope.set("<", Type::fun([Type::Int, Type::Int], Type::Bool));
    scope.set("<=", Type::fun([Type::Int, Type::Int], Type::Bool));
    scope.set(">", Type::fun([Type::Int, Type::Int], Type::Bool));
    scope.set(">=", Type::fun([Type::Int, Type::Int], Type::Bool));
    scope.set("and", Type::fun([Type::Bool, Type::Bool], Type::Bool));
    scope.set("or", Type::fun([Type::Bool, Type::Bool], Type::Bool));
    scope.set("unary_-", Type::fun([Type::Int], Type::Int));
    scope.set("unary_not", Type::fun([Type::Bool], Type::Bool));
    scope.set("print_int", Type::fun([Type::Int], Type::Unit));
    scope.set("print_bool", Type::fun([Type::Bool], Type::Unit));
    scope.set("read_int", Type::fun([], Type::Int));
    scope
}

pub struct TypeChecker {
    scope: Scope<Type>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker {
            scope: builtin_scope(),
        }
    }

    pub fn check(&mut self, node: &mut Node) -> Result<Type, TypeError> {
        let ty = self.check_expr(node)?;
        node.type_ = ty.clone();
        Ok(ty)
    }

    fn check_expr(&mut self, node: &mut Node) -> Result<Type, TypeError> {
        let location = node.location.clone();
        let ty = match &mut node.expr {
            Expression::Literal(LiteralValue::Int(_)) => Type::Int,
            Expression::Literal(LiteralValue::Bool(_)) => Type::Bool,
            Expression::Literal(LiteralValue::Unit) => Type::Unit,

            Expression::Identifier(name) => {
                self.scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownName {
                        location: location.clone(),
                        name: name.clone(),
                    })?
            }

            Expression::UnaryOp { op, expr } => {
                let operand_type = self.check(expr)?;
                let key = format!("unary_{op}");
                let sig = self
                    .scope
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownOperator {
                        location: location.clone(),
                        op: op.clone(),
                    })?;
                let (arg_types, return_type) = expect_fun(sig);
                if operand_type != arg_types[0] {
                    return Err(TypeError::OperandMismatch {
                        location,
                        op: op.clone(),
                        expected: arg_types[0].to_string(),
                        found: operand_type.to_string(),
                    });
                }
                return_type
            }

            Expression::BinaryOp { left, op, right } if op == "=" => {
                let right_type = self.check(right)?;
                let name = match &left.expr {
                    Expression::Identifier(name) => name.clone(),
                    _ => {
                        return Err(TypeError::AssignmentTargetNotIdentifier {
                            location: left.location.clone(),
                        })
                    }
                };
                let left_type = self
                    .scope
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownName {
                        location: left.location.clone(),
                        name: name.clone(),
                    })?;
                if left_type != right_type {
                    return Err(TypeError::OperandMismatch {
                        location,
                        op: "=".to_string(),
                        expected: left_type.to_string(),
                        found: right_type.to_string(),
                    });
                }
                self.scope.assign(&name, right_type.clone());
                left.type_ = left_type;
                right_type
            }

            Expression::BinaryOp { left, op, right } if op == "==" || op == "!=" => {
                let left_type = self.check(left)?;
                let right_type = self.check(right)?;
                if left_type != right_type {
                    return Err(TypeError::OperandMismatch {
                        location,
                        op: op.clone(),
                        expected: left_type.to_string(),
                        found: right_type.to_string(),
                    });
                }
                Type::Bool
            }

            Expression::BinaryOp { left, op, right } => {
                let left_type = self.check(left)?;
                let right_type = self.check(right)?;
                let sig = self
                    .scope
                    .get(op)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownOperator {
                        location: location.clone(),
                        op: op.clone(),
                    })?;
                let (arg_types, return_type) = expect_fun(sig);
                if left_type != arg_types[0] || right_type != arg_types[1] {
                    return Err(TypeError::OperandMismatch {
                        location,
                        op: op.clone(),
                        expected: format!("{} and {}", arg_types[0], arg_types[1]),
                        found: format!("{left_type} and {right_type}"),
                    });
                }
                return_type
            }

            Expression::IfExpression {
                cond,
                then_clause,
                else_clause,
            } => {
                let cond_type = self.check(cond)?;
                if cond_type != Type::Bool {
                    return Err(TypeError::ConditionNotBool {
                        location: cond.location.clone(),
                        found: cond_type.to_string(),
                    });
                }
                let then_type = self.check(then_clause)?;
                match else_clause {
                    None => Type::Unit,
                    Some(else_clause) => {
                        let else_type = self.check(else_clause)?;
                        if then_type != else_type {
                            return Err(TypeError::BranchMismatch {
                                location,
                                then_type: then_type.to_string(),
                                else_type: else_type.to_string(),
                            });
                        }
                        then_type
                    }
                }
            }

            Expression::WhileExpression { cond, do_clause } => {
                let cond_type = self.check(cond)?;
                if cond_type != Type::Bool {
                    return Err(TypeError::ConditionNotBool {
                        location: cond.location.clone(),
                        found: cond_type.to_string(),
                    });
                }
                self.check(do_clause)?;
                Type::Unit
            }

            Expression::Block(statements) => {
                self.scope.push();
                let mut result = Type::Unit;
                let check_result = (|| {
                    for statement in statements.iter_mut() {
                        result = self.check(statement)?;
                    }
                    Ok(())
                })();
                self.scope.pop();
                check_result?;
                result
            }

            Expression::VarDeclaration {
                name,
                declared_type,
                value,
            } => {
                if self.scope.get_local(name).is_some() {
                    return Err(TypeError::Redeclaration {
                        location,
                        name: name.clone(),
                    });
                }
                let value_type = self.check(value)?;
                if let Some(declared) = declared_type {
                    let resolved =
                        Type::from_name(declared).ok_or_else(|| TypeError::UnknownDeclaredType {
                            location: location.clone(),
                            name: declared.clone(),
                        })?;
                    if resolved != value_type {
                        return Err(TypeError::DeclaredTypeMismatch {
                            location,
                            declared: resolved.to_string(),
                            inferred: value_type.to_string(),
                        });
                    }
                }
                self.scope.set(name.clone(), value_type);
                Type::Unit
            }

            Expression::FunctionCall { name, arguments } => {
                let sig = self
                    .scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownName {
                        location: location.clone(),
                        name: name.clone(),
                    })?;
                let (arg_types, return_type) = match sig {
                    Type::Fun(args, ret) => (args, *ret),
                    other => {
                        return Err(TypeError::NotCallable {
                            location,
                            name: format!("{name} ({other})"),
                        })
                    }
                };
                if arguments.len() != arg_types.len() {
                    return Err(TypeError::ArityMismatch {
                        location,
                        name: name.clone(),
                        expected: arg_types.len(),
                        found: arguments.len(),
                    });
                }
                for (arg, expected) in arguments.iter_mut().zip(arg_types.iter()) {
                    let found = self.check(arg)?;
                    if &found != expected {
                        return Err(TypeError::OperandMismatch {
                            location: arg.location.clone(),
                            op: name.clone(),
                            expected: expected.to_string(),
                            found: found.to_string(),
                        });
                    }
                }
                return_type
            }
        };
        Ok(ty)
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        TypeChecker::new()
    }
}

fn expect_fun(ty: Type) -> (Vec<Type>, Type) {
    match ty {
        Type::Fun(args, ret) => (args, *ret),
        other => unreachable!("builtin symbol table entry was not a Fun: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check_source(src: &str) -> Result<Type, TypeError> {
        let mut node = parse(src, "t").expect("source should parse");
        TypeChecker::new().check(&mut node)
    }

    #[test]
    fn arithmetic_and_comparison_compose() {
        assert_eq!(check_source("1 + 2 * 3").unwrap(), Type::Int);
        assert_eq!(check_source("1 < 2").unwrap(), Type::Bool);
    }

    #[test]
    fn if_without_else_is_unit() {
        assert_eq!(check_source("if 1 < 2 then 3").unwrap(), Type::Unit);
    }

    #[test]
    fn if_branches_must_match() {
        assert!(check_source("if 1<2 then 3 else 4<5").is_err());
    }

    #[test]
    fn while_is_unit_and_requires_bool_condition() {
        assert_eq!(
            check_source("var i = 0; while i < 3 do i = i + 1; i").unwrap(),
            Type::Int
        );
        assert!(check_source("while 1 do 2").is_err());
    }

    #[test]
    fn shadowing_in_inner_scope_does_not_leak_out() {
        assert_eq!(
            check_source("var x = 1; { var x = true; x }").unwrap(),
            Type::Bool
        );
    }

    #[test]
    fn assignment_is_an_expression_with_the_variable_type() {
        assert_eq!(check_source("var x = 1; x = 2").unwrap(), Type::Int);
    }

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        assert!(check_source("var x=1; var x=2").is_err());
    }

    #[test]
    fn declared_type_mismatch_is_an_error() {
        assert!(check_source("var a: Bool = 2").is_err());
    }

    #[test]
    fn unknown_declared_type_is_an_error() {
        assert!(check_source("var c: something = 1").is_err());
    }

    #[test]
    fn operand_mismatches_are_rejected() {
        assert!(check_source("(1<3)+3").is_err());
        assert!(check_source("true<3").is_err());
        assert!(check_source("true and 3").is_err());
        assert!(check_source("-false").is_err());
        assert!(check_source("not 1").is_err());
        assert!(check_source("true==1").is_err());
        assert!(check_source("if 1 then 3 else 4").is_err());
    }

    #[test]
    fn builtin_argument_types_are_checked() {
        assert!(check_source("print_int(true)").is_err());
        assert!(check_source("read_int(1)").is_err());
    }
}
