//! Reference tree-walking interpreter. Not part of the compiler's own
//! pipeline, but built alongside it so `run` and the test suite can
//! check compiled output against an independent evaluation of the same
//! AST, per the codegen/interpreter equivalence this repo is built to
//! preserve.
//!
//! Division and remainder truncate toward zero, matching `idivq` rather
//! than the floor-division an interpreter in isolation might otherwise
//! choose, so the two semantics agree on every well-typed program.

use crate::ast::{Expression, LiteralValue, Node};
use crate::scope::Scope;
use std::fmt;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Unit,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Unit => write!(f, "Unit"),
        }
    }
}

#[derive(Debug)]
pub enum RuntimeError {
    DivisionByZero,
    Io(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Reads `read_int` input one whitespace-separated token at a time from
/// any `BufRead`, so tests can feed a fixed stream instead of stdin.
pub struct Interpreter<R: BufRead> {
    scope: Scope<Value>,
    input: std::io::Bytes<R>,
    out: String,
}

impl<R: BufRead> Interpreter<R> {
    pub fn new(input: R) -> Self {
        Interpreter {
            scope: Scope::new(),
            input: input.bytes(),
            out: String::new(),
        }
    }

    /// Runs the program and returns everything written by `print_int`/
    /// `print_bool`, each call followed by a newline. If the root
    /// expression's type is `Int` or `Bool`, its value is printed after
    /// the program finishes, mirroring the `print_int`/`print_bool` call
    /// the IR generator appends for the compiled backend.
    pub fn run(mut self, node: &Node) -> Result<String, RuntimeError> {
        let result = self.eval(node)?;
        match result {
            Value::Int(v) => {
                self.out.push_str(&v.to_string());
                self.out.push('\n');
            }
            Value::Bool(v) => {
                self.out.push_str(if v { "true" } else { "false" });
                self.out.push('\n');
            }
            Value::Unit => {}
        }
        Ok(self.out)
    }

    /// Mirrors `scanf("%" SCNd64, ...)` in the linked runtime: skips
    /// leading whitespace (of any kind, spanning newlines), then reads
    /// up to the next whitespace byte or end of input as one token.
    fn next_int(&mut self) -> Result<i64, RuntimeError> {
        let mut token = Vec::new();
        loop {
            match self.input.next() {
                None => break,
                Some(Err(e)) => return Err(RuntimeError::Io(e.to_string())),
                Some(Ok(b)) if (b as char).is_ascii_whitespace() => {
                    if !token.is_empty() {
                        break;
                    }
                }
                Some(Ok(b)) => token.push(b),
            }
        }
        if token.is_empty() {
            return Err(RuntimeError::Io("unexpected end of input".to_string()));
        }
        String::from_utf8_lossy(&token)
            .parse::<i64>()
            .map_err(|e| RuntimeError::Io(e.to_string()))
    }

    fn eval(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        match &node.expr {
            Expression::Literal(LiteralValue::Int(v)) => Ok(Value::Int(*v)),
            Expression::Literal(LiteralValue::Bool(v)) => Ok(Value::Bool(*v)),
            Expression::Literal(LiteralValue::Unit) => Ok(Value::Unit),

            Expression::Identifier(name) => Ok(*self
                .scope
                .get(name)
                .expect("type-checked program referenced an unbound name")),

            Expression::UnaryOp { op, expr } => {
                let operand = self.eval(expr)?;
                Ok(match (op.as_str(), operand) {
                    ("-", Value::Int(v)) => Value::Int(v.wrapping_neg()),
                    ("not", Value::Bool(v)) => Value::Bool(!v),
                    _ => unreachable!("type-checked program had a malformed unary op"),
                })
            }

            Expression::BinaryOp { left, op, right } if op == "=" => {
                let value = self.eval(right)?;
                let name = match &left.expr {
                    Expression::Identifier(name) => name,
                    _ => unreachable!("type-checked program assigned to a non-identifier"),
                };
                self.scope.assign(name, value);
                Ok(value)
            }

            Expression::BinaryOp { left, op, right } if op == "and" => {
                match self.eval(left)? {
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    Value::Bool(true) => self.eval(right),
                    _ => unreachable!("type-checked program had a non-bool 'and' operand"),
                }
            }

            Expression::BinaryOp { left, op, right } if op == "or" => {
                match self.eval(left)? {
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    Value::Bool(false) => self.eval(right),
                    _ => unreachable!("type-checked program had a non-bool 'or' operand"),
                }
            }

            Expression::BinaryOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                eval_binary_op(op, left, right)
            }

            Expression::IfExpression {
                cond,
                then_clause,
                else_clause,
            } => {
                let cond = match self.eval(cond)? {
                    Value::Bool(v) => v,
                    _ => unreachable!("type-checked program had a non-bool condition"),
                };
                if cond {
                    self.eval(then_clause)
                } else if let Some(else_clause) = else_clause {
                    self.eval(else_clause)
                } else {
                    Ok(Value::Unit)
                }
            }

            Expression::WhileExpression { cond, do_clause } => {
                loop {
                    let cond_value = match self.eval(cond)? {
                        Value::Bool(v) => v,
                        _ => unreachable!("type-checked program had a non-bool condition"),
                    };
                    if !cond_value {
                        return Ok(Value::Unit);
                    }
                    self.eval(do_clause)?;
                }
            }

            Expression::VarDeclaration { name, value, .. } => {
                let value = self.eval(value)?;
                self.scope.set(name.clone(), value);
                Ok(Value::Unit)
            }

            Expression::Block(statements) => {
                self.scope.push();
                let mut result = Value::Unit;
                for statement in statements {
                    match self.eval(statement) {
                        Ok(v) => result = v,
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
                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.eval(arg)?);
                }
                match name.as_str() {
                    "print_int" => {
                        self.out.push_str(&args[0].to_string());
                        self.out.push('\n');
                        Ok(Value::Unit)
                    }
                    "print_bool" => {
                        let Value::Bool(v) = args[0] else {
                            unreachable!("type-checked program passed a non-bool to print_bool")
                        };
                        self.out.push_str(if v { "true" } else { "false" });
                        self.out.push('\n');
                        Ok(Value::Unit)
                    }
                    "read_int" => Ok(Value::Int(self.next_int()?)),
                    other => unreachable!("type-checked program called unknown builtin '{other}'"),
                }
            }
        }
    }
}

fn eval_binary_op(op: &str, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use Value::*;
    Ok(match (op, left, right) {
        ("+", Int(a), Int(b)) => Int(a.wrapping_add(b)),
        ("-", Int(a), Int(b)) => Int(a.wrapping_sub(b)),
        ("*", Int(a), Int(b)) => Int(a.wrapping_mul(b)),
        ("/", Int(a), Int(b)) => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Int(a.wrapping_div(b))
        }
        ("%", Int(a), Int(b)) => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Int(a.wrapping_rem(b))
        }
        ("<", Int(a), Int(b)) => Bool(a < b),
        ("<=", Int(a), Int(b)) => Bool(a <= b),
        (">", Int(a), Int(b)) => Bool(a > b),
        (">=", Int(a), Int(b)) => Bool(a >= b),
        ("==", a, b) => Bool(a == b),
        ("!=", a, b) => Bool(a != b),
        _ => unreachable!("type-checked program had a malformed binary op '{op}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::typechecker::TypeChecker;
    use std::io::Cursor;

    fn run(src: &str) -> String {
        run_with_input(src, "")
    }

    fn run_with_input(src: &str, input: &str) -> String {
        let mut node = parse(src, "t").unwrap();
        TypeChecker::new().check(&mut node).unwrap();
        Interpreter::new(Cursor::new(input.as_bytes().to_vec())).run(&node).unwrap()
    }

    #[test]
    fn arithmetic_truncates_toward_zero_like_idivq() {
        assert_eq!(run("-7 / 2"), "-3\n");
        assert_eq!(run("-7 % 2"), "-1\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let mut node = parse("1 / 0", "t").unwrap();
        TypeChecker::new().check(&mut node).unwrap();
        let result = Interpreter::new(Cursor::new(Vec::new())).run(&node);
        assert!(result.is_err());
    }

    #[test]
    fn and_or_short_circuit() {
        assert_eq!(run("false and (1 / 0 < 1)"), "false\n");
        assert_eq!(run("true or (1 / 0 < 1)"), "true\n");
    }

    #[test]
    fn print_bool_is_lowercase() {
        assert_eq!(run("true"), "true\n");
        assert_eq!(run("false"), "false\n");
    }

    #[test]
    fn while_loop_mutates_outer_binding() {
        assert_eq!(run("var i = 0; while i < 3 do i = i + 1; i"), "3\n");
    }

    #[test]
    fn read_int_consumes_one_line_per_call() {
        assert_eq!(run_with_input("read_int() + read_int()", "3\n4\n"), "7\n");
    }

    #[test]
    fn read_int_tokenizes_on_whitespace_not_lines() {
        assert_eq!(run_with_input("read_int() + read_int()", "3 4"), "7\n");
    }

    #[test]
    fn trailing_semicolon_makes_block_evaluate_to_unit() {
        assert_eq!(run("{ 1; }"), "");
    }
}
