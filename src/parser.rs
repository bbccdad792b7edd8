//! Recursive-descent, one-token-lookahead parser with a Pratt-style
//! precedence ladder for binary operators.
//!
//! The language is expression-oriented: `if`, `while`, blocks, and `var`
//! are all parsed as expressions rather than statements. `var` is only
//! accepted where the grammar calls a statement "top of a block" — every
//! other call site threads `allow_var = false` down through the ladder,
//! which is what makes `if a then var x = 1` a parse error even though
//! `{ var x = 1 }` is fine.

use crate::ast::{Expression, LiteralValue, Node};
use crate::error::ParseError;
use crate::location::SourceLocation;
use crate::token::{tokenize, Token, TokenKind};

enum Stop {
    CloseBrace,
    EndOfInput,
}

impl Stop {
    fn matches(&self, token: &Token) -> bool {
        match self {
            Stop::CloseBrace => token.is("}"),
            Stop::EndOfInput => token.kind == TokenKind::End,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Stop::CloseBrace => "';' or '}'",
            Stop::EndOfInput => "';' or end of input",
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses `source` into a single root expression. The entire token
/// stream is treated as the body of a synthetic top-level block, so
/// sequencing and `var` work uniformly at the top level; if that block
/// ends up with exactly one statement, the block is unwrapped and that
/// statement is returned directly.
pub fn parse(source: &str, file: &str) -> Result<Node, ParseError> {
    let tokens = tokenize(source, file).map_err(|e| ParseError::UnexpectedToken {
        location: match &e {
            crate::error::LexError::UnexpectedCharacter { location, .. } => location.clone(),
        },
        expected: "valid token".to_string(),
        found: e.to_string(),
    })?;
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let first_location = tokens[0].location.clone();
    let mut parser = Parser { tokens, pos: 0 };
    let statements = parser.parse_statement_list(&Stop::EndOfInput)?;

    if statements.len() == 1 {
        Ok(statements.into_iter().next().unwrap())
    } else {
        Ok(Node::new(first_location, Expression::Block(statements)))
    }
}

impl Parser {
    fn peek(&self) -> Token {
        if self.pos < self.tokens.len() {
            self.tokens[self.pos].clone()
        } else {
            let loc = self
                .tokens
                .last()
                .map(|t| t.location.clone())
                .unwrap_or_else(SourceLocation::sentinel);
            Token::end_at(loc)
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn consume(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self.peek();
        if !token.is(expected) {
            return Err(ParseError::UnexpectedToken {
                location: token.location.clone(),
                expected: format!("'{expected}'"),
                found: token.to_string(),
            });
        }
        Ok(self.advance())
    }

    fn parse_identifier_name(&mut self) -> Result<(String, SourceLocation), ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier {
            self.advance();
            Ok((token.text, token.location))
        } else {
            Err(ParseError::UnexpectedToken {
                location: token.location.clone(),
                expected: "identifier".to_string(),
                found: token.to_string(),
            })
        }
    }

    /// Parses statements separated by `;`, stopping when `stop` matches
    /// the next token. A statement whose tail is itself a block (an `if`
    /// whose last clause is a block, a bare block, etc.) does not need a
    /// trailing `;` before the next statement. A `;` directly before the
    /// stop token appends a synthetic unit literal.
    fn parse_statement_list(&mut self, stop: &Stop) -> Result<Vec<Node>, ParseError> {
        let mut statements = Vec::new();
        if stop.matches(&self.peek()) {
            return Ok(statements);
        }
        loop {
            let stmt = self.parse_expression(true)?;
            let tail_is_block = ends_with_block(&stmt.expr);
            statements.push(stmt);

            if stop.matches(&self.peek()) {
                break;
            }
            if self.peek().is(";") {
                self.advance();
                if stop.matches(&self.peek()) {
                    statements.push(Node::unit_literal(self.peek().location.clone()));
                    break;
                }
                continue;
            }
            if tail_is_block {
                continue;
            }
            let token = self.peek();
            return Err(ParseError::UnexpectedToken {
                location: token.location.clone(),
                expected: stop.describe().to_string(),
                found: token.to_string(),
            });
        }
        Ok(statements)
    }

    fn parse_expression(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        self.parse_assignment(allow_var)
    }

    fn parse_assignment(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let left = self.parse_or(allow_var)?;
        if self.peek().is("=") {
            let op_token = self.advance();
            let right = self.parse_assignment(false)?;
            let location = left.location.clone();
            return Ok(Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op: op_token.text,
                    right: Box::new(right),
                },
            ));
        }
        Ok(left)
    }

    fn parse_or(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let mut left = self.parse_and(allow_var)?;
        while self.peek().is("or") {
            let op = self.advance().text;
            let right = self.parse_and(false)?;
            let location = left.location.clone();
            left = Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let mut left = self.parse_equality(allow_var)?;
        while self.peek().is("and") {
            let op = self.advance().text;
            let right = self.parse_equality(false)?;
            let location = left.location.clone();
            left = Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_equality(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let mut left = self.parse_comparison(allow_var)?;
        while self.peek().is_one_of(&["==", "!="]) {
            let op = self.advance().text;
            let right = self.parse_comparison(false)?;
            let location = left.location.clone();
            left = Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_comparison(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let mut left = self.parse_addition(allow_var)?;
        while self.peek().is_one_of(&["<", "<=", ">", ">="]) {
            let op = self.advance().text;
            let right = self.parse_addition(false)?;
            let location = left.location.clone();
            left = Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_addition(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let mut left = self.parse_multiplication(allow_var)?;
        while self.peek().is_one_of(&["+", "-"]) {
            let op = self.advance().text;
            let right = self.parse_multiplication(false)?;
            let location = left.location.clone();
            left = Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let mut left = self.parse_unary(allow_var)?;
        while self.peek().is_one_of(&["*", "/", "%"]) {
            let op = self.advance().text;
            let right = self.parse_unary(false)?;
            let location = left.location.clone();
            left = Node::new(
                location,
                Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        if self.peek().is_one_of(&["-", "not"]) {
            let op_token = self.advance();
            let expr = self.parse_unary(false)?;
            return Ok(Node::new(
                op_token.location,
                Expression::UnaryOp {
                    op: op_token.text,
                    expr: Box::new(expr),
                },
            ));
        }
        self.parse_factor(allow_var)
    }

    fn parse_factor(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value: i64 = token.text.parse().map_err(|_| ParseError::UnexpectedToken {
                    location: token.location.clone(),
                    expected: "integer literal".to_string(),
                    found: token.to_string(),
                })?;
                Ok(Node::new(
                    token.location,
                    Expression::Literal(LiteralValue::Int(value)),
                ))
            }
            TokenKind::BoolLiteral => {
                self.advance();
                Ok(Node::new(
                    token.location,
                    Expression::Literal(LiteralValue::Bool(token.text == "true")),
                ))
            }
            TokenKind::Identifier => match token.text.as_str() {
                "if" => self.parse_if(),
                "while" => self.parse_while(),
                "var" => self.parse_var_declaration(allow_var),
                "then" | "else" | "do" | "and" | "or" | "not" | "true" | "false" => {
                    Err(ParseError::UnexpectedToken {
                        location: token.location.clone(),
                        expected: "expression".to_string(),
                        found: token.to_string(),
                    })
                }
                _ => {
                    let (name, location) = self.parse_identifier_name()?;
                    if self.peek().is("(") {
                        self.parse_call(name, location)
                    } else {
                        Ok(Node::new(location, Expression::Identifier(name)))
                    }
                }
            },
            TokenKind::Punctuation if token.is("(") => self.parse_parenthesized(),
            TokenKind::Punctuation if token.is("{") => self.parse_block(),
            _ => Err(ParseError::UnexpectedToken {
                location: token.location.clone(),
                expected: "expression".to_string(),
                found: token.to_string(),
            }),
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Node, ParseError> {
        self.consume("(")?;
        let expr = self.parse_expression(false)?;
        self.consume(")")?;
        Ok(expr)
    }

    fn parse_block(&mut self) -> Result<Node, ParseError> {
        let open = self.consume("{")?;
        let statements = self.parse_statement_list(&Stop::CloseBrace)?;
        self.consume("}")?;
        Ok(Node::new(open.location, Expression::Block(statements)))
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        let if_token = self.consume("if")?;
        let cond = self.parse_expression(false)?;
        self.consume("then")?;
        let then_clause = self.parse_expression(false)?;
        let else_clause = if self.peek().is("else") {
            self.advance();
            Some(Box::new(self.parse_expression(false)?))
        } else {
            None
        };
        Ok(Node::new(
            if_token.location,
            Expression::IfExpression {
                cond: Box::new(cond),
                then_clause: Box::new(then_clause),
                else_clause,
            },
        ))
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        let while_token = self.consume("while")?;
        let cond = self.parse_expression(false)?;
        self.consume("do")?;
        let do_clause = self.parse_expression(false)?;
        Ok(Node::new(
            while_token.location,
            Expression::WhileExpression {
                cond: Box::new(cond),
                do_clause: Box::new(do_clause),
            },
        ))
    }

    fn parse_var_declaration(&mut self, allow_var: bool) -> Result<Node, ParseError> {
        let var_token = self.consume("var")?;
        if !allow_var {
            return Err(ParseError::VarNotAllowedHere {
                location: var_token.location,
            });
        }
        let (name, _) = self.parse_identifier_name()?;
        let declared_type = if self.peek().is(":") {
            self.advance();
            let (type_name, _) = self.parse_identifier_name()?;
            Some(type_name)
        } else {
            None
        };
        self.consume("=")?;
        let value = self.parse_expression(false)?;
        Ok(Node::new(
            var_token.location,
            Expression::VarDeclaration {
                name,
                declared_type,
                value: Box::new(value),
            },
        ))
    }

    fn parse_call(&mut self, name: String, location: SourceLocation) -> Result<Node, ParseError> {
        self.consume("(")?;
        let mut arguments = Vec::new();
        if !self.peek().is(")") {
            loop {
                arguments.push(self.parse_expression(false)?);
                if self.peek().is(")") {
                    break;
                }
                self.consume(",")?;
            }
        }
        self.consume(")")?;
        Ok(Node::new(location, Expression::FunctionCall { name, arguments }))
    }
}

/// A statement "ends with a block" if its syntactic tail is a `Block`,
/// letting the following statement omit the separating `;`.
fn ends_with_block(expr: &Expression) -> bool {
    match expr {
        Expression::Block(_) => true,
        Expression::IfExpression {
            then_clause,
            else_clause,
            ..
        } => match else_clause {
            Some(else_clause) => ends_with_block(&else_clause.expr),
            None => ends_with_block(&then_clause.expr),
        },
        Expression::WhileExpression { do_clause, .. } => ends_with_block(&do_clause.expr),
        Expression::VarDeclaration { value, .. } => ends_with_block(&value.expr),
        Expression::BinaryOp { right, .. } => ends_with_block(&right.expr),
        Expression::UnaryOp { expr, .. } => ends_with_block(&expr.expr),
        Expression::Literal(_) | Expression::Identifier(_) | Expression::FunctionCall { .. } => {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LiteralValue;

    fn lit_int(n: i64) -> Node {
        Node::new(SourceLocation::sentinel(), Expression::Literal(LiteralValue::Int(n)))
    }

    fn bin(left: Node, op: &str, right: Node) -> Node {
        Node::new(
            SourceLocation::sentinel(),
            Expression::BinaryOp {
                left: Box::new(left),
                op: op.to_string(),
                right: Box::new(right),
            },
        )
    }

    #[test]
    fn single_statement_unwraps_the_synthetic_block() {
        let node = parse("1", "t").unwrap();
        assert_eq!(node, lit_int(1));
    }

    #[test]
    fn respects_precedence_and_left_associativity() {
        let node = parse("1 + 2 * 3", "t").unwrap();
        assert_eq!(node, bin(lit_int(1), "+", bin(lit_int(2), "*", lit_int(3))));
    }

    #[test]
    fn assignment_is_right_associative() {
        let node = parse("x = y = 1", "t").unwrap();
        let ident = |n: &str| Node::new(SourceLocation::sentinel(), Expression::Identifier(n.to_string()));
        assert_eq!(node, bin(ident("x"), "=", bin(ident("y"), "=", lit_int(1))));
    }

    #[test]
    fn block_without_trailing_semicolon_after_if_block() {
        let node = parse("{ if true then { 1 } 2 }", "t").unwrap();
        match node.expr {
            Expression::Block(statements) => assert_eq!(statements.len(), 2),
            _ => panic!("expected a block with two statements"),
        }
    }

    #[test]
    fn trailing_semicolon_appends_unit_literal() {
        let node = parse("{ 1; }", "t").unwrap();
        match node.expr {
            Expression::Block(statements) => {
                assert_eq!(statements.len(), 2);
                assert_eq!(statements[1].expr, Expression::Literal(LiteralValue::Unit));
            }
            _ => panic!("expected a block"),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse("", "t").is_err());
    }

    #[test]
    fn unbalanced_parens_is_an_error() {
        assert!(parse("1 * (2 + 3(", "t").is_err());
    }

    #[test]
    fn dangling_minus_is_an_error() {
        assert!(parse("1 -", "t").is_err());
    }

    #[test]
    fn trailing_tokens_after_a_statement_is_an_error() {
        assert!(parse("a + b c", "t").is_err());
    }

    #[test]
    fn bare_if_is_an_error() {
        assert!(parse("if", "t").is_err());
    }

    #[test]
    fn trailing_comma_in_call_is_an_error() {
        assert!(parse("f(1,)", "t").is_err());
    }

    #[test]
    fn bare_not_is_an_error() {
        assert!(parse("not", "t").is_err());
    }

    #[test]
    fn while_without_do_is_an_error() {
        assert!(parse("while a", "t").is_err());
    }

    #[test]
    fn var_without_initializer_is_an_error() {
        assert!(parse("var a", "t").is_err());
    }

    #[test]
    fn comma_separated_block_is_an_error() {
        assert!(parse("{a, b}", "t").is_err());
    }

    #[test]
    fn lone_semicolon_block_is_an_error() {
        assert!(parse("{;}", "t").is_err());
    }

    #[test]
    fn missing_separator_in_block_is_an_error() {
        assert!(parse("{a b}", "t").is_err());
    }

    #[test]
    fn var_in_if_then_position_is_an_error() {
        assert!(parse("if a then var x = 1", "t").is_err());
    }

    #[test]
    fn var_in_while_condition_is_an_error() {
        assert!(parse("while var x = 1 do a", "t").is_err());
    }

    #[test]
    fn var_in_call_argument_is_an_error() {
        assert!(parse("f(var x = 1)", "t").is_err());
    }
}
