//! Lexical analysis: source text to a flat token stream.
//!
//! A longest-match, left-to-right scanner. Comments and whitespace are
//! skipped without producing tokens; a tab advances the column counter by
//! 8 to keep reported columns meaningful for most editors.

use crate::error::LexError;
use crate::location::SourceLocation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    IntLiteral,
    BoolLiteral,
    Identifier,
    Operator,
    Punctuation,
    /// Synthesized by the parser when it reads past the last real token.
    /// Never produced by [`tokenize`].
    End,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub location: SourceLocation,
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(location: SourceLocation, kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            location,
            kind,
            text: text.into(),
        }
    }

    pub fn end_at(location: SourceLocation) -> Self {
        Token::new(location, TokenKind::End, "")
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_one_of(&self, options: &[&str]) -> bool {
        options.iter().any(|o| self.is(o))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TokenKind::End {
            write!(f, "end of input")
        } else {
            write!(f, "\"{}\"", self.text)
        }
    }
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "+", "-", "*", "/", "=", "<", ">", "%",
];
const PUNCTUATION: &[char] = &['(', ')', '{', '}', ',', ';', ':'];

/// Scans `source` into a finite token sequence. There is no `end`
/// sentinel in the returned vector; the parser synthesizes one when it
/// reads past the last token.
pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, LexError> {
    let bytes = source.as_bytes();
    let mut pos = 0usize;
    let mut line = 0usize;
    let mut column = 0usize;
    let mut tokens = Vec::new();

    while pos < bytes.len() {
        let c = bytes[pos] as char;

        // Comments: `//...` or `#...` run to end of line.
        if (c == '/' && bytes.get(pos + 1) == Some(&b'/')) || c == '#' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
                column = 0;
            } else if c == '\t' {
                column += 8;
            } else {
                column += 1;
            }
            pos += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < bytes.len() {
                let ch = bytes[pos] as char;
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    pos += 1;
                } else {
                    break;
                }
            }
            let text = &source[start..pos];
            let kind = if text == "true" || text == "false" {
                TokenKind::BoolLiteral
            } else {
                TokenKind::Identifier
            };
            let loc = SourceLocation::new(file, line, column);
            column += text.len();
            tokens.push(Token::new(loc, kind, text));
            continue;
        }

        if c.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len() && (bytes[pos] as char).is_ascii_digit() {
                pos += 1;
            }
            let text = &source[start..pos];
            let loc = SourceLocation::new(file, line, column);
            column += text.len();
            tokens.push(Token::new(loc, TokenKind::IntLiteral, text));
            continue;
        }

        if let Some(op) = OPERATORS.iter().find(|op| source[pos..].starts_with(**op)) {
            let loc = SourceLocation::new(file, line, column);
            column += op.len();
            tokens.push(Token::new(loc, TokenKind::Operator, *op));
            pos += op.len();
            continue;
        }

        if PUNCTUATION.contains(&c) {
            let loc = SourceLocation::new(file, line, column);
            column += 1;
            tokens.push(Token::new(loc, TokenKind::Punctuation, c.to_string()));
            pos += 1;
            continue;
        }

        return Err(LexError::UnexpectedCharacter {
            location: SourceLocation::new(file, line, column),
            character: c,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src, "test")
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn tokenizes_arithmetic() {
        assert_eq!(
            kinds("1 + 2 * 3"),
            vec![
                (TokenKind::IntLiteral, "1".into()),
                (TokenKind::Operator, "+".into()),
                (TokenKind::IntLiteral, "2".into()),
                (TokenKind::Operator, "*".into()),
                (TokenKind::IntLiteral, "3".into()),
            ]
        );
    }

    #[test]
    fn longest_match_prefers_two_char_operators() {
        assert_eq!(
            kinds("a == b"),
            vec![
                (TokenKind::Identifier, "a".into()),
                (TokenKind::Operator, "==".into()),
                (TokenKind::Identifier, "b".into()),
            ]
        );
    }

    #[test]
    fn true_and_false_are_bool_literals() {
        assert_eq!(
            kinds("true false"),
            vec![
                (TokenKind::BoolLiteral, "true".into()),
                (TokenKind::BoolLiteral, "false".into()),
            ]
        );
    }

    #[test]
    fn skips_both_comment_styles() {
        assert_eq!(
            kinds("1 // comment\n+ 2 # another\n"),
            vec![
                (TokenKind::IntLiteral, "1".into()),
                (TokenKind::Operator, "+".into()),
                (TokenKind::IntLiteral, "2".into()),
            ]
        );
    }

    #[test]
    fn locations_account_for_tabs_and_newlines() {
        let tokens = tokenize("\ta\nb", "test").unwrap();
        assert_eq!(tokens[0].location.line, 0);
        assert_eq!(tokens[0].location.column, 8);
        assert_eq!(tokens[1].location.line, 1);
        assert_eq!(tokens[1].location.column, 0);
    }

    #[test]
    fn unknown_character_is_a_lex_error() {
        let err = tokenize("1 $ 2", "test").unwrap_err();
        match err {
            LexError::UnexpectedCharacter { character, .. } => assert_eq!(character, '$'),
        }
    }
}
