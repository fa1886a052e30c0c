// src/predicate/parser.rs

//! Tokenizer and recursive-descent parser for match expressions.
//!
//! Grammar:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" or ")" | path [ cmp value ]
//! ```

use regex::{Regex, RegexBuilder};

use crate::errors::{HookrunError, Result};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `~=`: regex match.
    Matches,
    /// `^=`
    StartsWith,
    /// `$=`
    EndsWith,
    /// `*=`
    Contains,
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone)]
pub enum Literal {
    /// A word or quoted string. `quoted` is false for bare words, which may
    /// also stand for numbers, booleans or `null`.
    Text { text: String, quoted: bool },
    Regex(Regex),
}

/// Parsed match expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Bare path: truthiness test.
    Truthy(Vec<String>),
    Compare {
        path: Vec<String>,
        op: CmpOp,
        rhs: Literal,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Op(CmpOp),
    Word(String),
    Quoted(String),
    Regex { pattern: String, flags: String },
}

const TWO_CHAR_OPS: &[(&str, Token)] = &[
    ("&&", Token::And),
    ("||", Token::Or),
    ("==", Token::Op(CmpOp::Eq)),
    ("!=", Token::Op(CmpOp::Ne)),
    ("<=", Token::Op(CmpOp::Le)),
    (">=", Token::Op(CmpOp::Ge)),
    ("~=", Token::Op(CmpOp::Matches)),
    ("^=", Token::Op(CmpOp::StartsWith)),
    ("$=", Token::Op(CmpOp::EndsWith)),
    ("*=", Token::Op(CmpOp::Contains)),
];

fn starts_operator(rest: &str) -> bool {
    TWO_CHAR_OPS.iter().any(|(op, _)| rest.starts_with(op))
        || rest.starts_with(['<', '>', '='])
        || rest.starts_with('(')
        || rest.starts_with(')')
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(c) = rest.chars().next() else { break };

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        if let Some((op, tok)) = TWO_CHAR_OPS.iter().find(|(op, _)| rest.starts_with(op)) {
            tokens.push(tok.clone());
            pos += op.len();
            continue;
        }

        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '!' => Some(Token::Not),
            '<' => Some(Token::Op(CmpOp::Lt)),
            '>' => Some(Token::Op(CmpOp::Gt)),
            '=' => Some(Token::Op(CmpOp::Eq)),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push(tok);
            pos += 1;
            continue;
        }

        if c == '\'' || c == '"' {
            let (text, used) = lex_quoted(rest, c)?;
            tokens.push(Token::Quoted(text));
            pos += used;
            continue;
        }

        // A slash directly after `~=` opens a regex literal; anywhere else it
        // is part of a word (e.g. `refs/heads/main`).
        if c == '/' && matches!(tokens.last(), Some(Token::Op(CmpOp::Matches))) {
            let (pattern, flags, used) = lex_regex(rest)?;
            tokens.push(Token::Regex { pattern, flags });
            pos += used;
            continue;
        }

        let mut end = 0;
        for (i, ch) in rest.char_indices() {
            if ch.is_whitespace() || (i > 0 && starts_operator(&rest[i..])) {
                break;
            }
            if ch == '!' && rest[i..].starts_with("!=") {
                break;
            }
            end = i + ch.len_utf8();
        }
        tokens.push(Token::Word(rest[..end].to_string()));
        pos += end;
    }

    Ok(tokens)
}

fn lex_quoted(rest: &str, quote: char) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut escaped = false;

    for (i, ch) in rest.char_indices().skip(1) {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Ok((out, i + ch.len_utf8()));
        } else {
            out.push(ch);
        }
    }

    Err(HookrunError::PredicateError(format!(
        "unterminated string literal starting with {quote}"
    )))
}

fn lex_regex(rest: &str) -> Result<(String, String, usize)> {
    let mut pattern = String::new();
    let mut escaped = false;

    for (i, ch) in rest.char_indices().skip(1) {
        if escaped {
            if ch != '/' {
                pattern.push('\\');
            }
            pattern.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '/' {
            let after = &rest[i + 1..];
            let flags: String = after
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            return Ok((pattern, flags.clone(), i + 1 + flags.len()));
        } else {
            pattern.push(ch);
        }
    }

    Err(HookrunError::PredicateError(
        "unterminated regex literal".to_string(),
    ))
}

fn build_regex(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            // `g` is meaningless for a yes/no match.
            'g' => {}
            other => {
                return Err(HookrunError::PredicateError(format!(
                    "unsupported regex flag '{other}'"
                )));
            }
        }
    }
    builder
        .build()
        .map_err(|e| HookrunError::PredicateError(format!("invalid regex /{pattern}/: {e}")))
}

/// Parse a match expression into an [`Expr`].
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(HookrunError::PredicateError(
            "empty match expression".to_string(),
        ));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;

    if let Some(tok) = parser.peek() {
        return Err(HookrunError::PredicateError(format!(
            "unexpected token {tok:?} in '{input}'"
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(HookrunError::PredicateError(format!(
                        "expected ')', found {other:?}"
                    ))),
                }
            }
            Some(Token::Word(word)) => {
                let path = split_path(&word)?;
                let op = match self.peek() {
                    Some(Token::Op(op)) => *op,
                    _ => return Ok(Expr::Truthy(path)),
                };
                self.pos += 1;
                let rhs = self.parse_literal(op)?;
                Ok(Expr::Compare { path, op, rhs })
            }
            other => Err(HookrunError::PredicateError(format!(
                "expected a property path, found {other:?}"
            ))),
        }
    }

    fn parse_literal(&mut self, op: CmpOp) -> Result<Literal> {
        let literal = match self.next() {
            Some(Token::Word(text)) => Literal::Text {
                text,
                quoted: false,
            },
            Some(Token::Quoted(text)) => Literal::Text { text, quoted: true },
            Some(Token::Regex { pattern, flags }) => {
                return Ok(Literal::Regex(build_regex(&pattern, &flags)?));
            }
            other => {
                return Err(HookrunError::PredicateError(format!(
                    "expected a value after {op:?}, found {other:?}"
                )));
            }
        };

        // `name ~= foo` treats the text itself as the pattern.
        match (op, &literal) {
            (CmpOp::Matches, Literal::Text { text, .. }) => {
                Ok(Literal::Regex(build_regex(text, "")?))
            }
            _ => Ok(literal),
        }
    }
}

fn split_path(word: &str) -> Result<Vec<String>> {
    let segments: Vec<String> = word.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(HookrunError::PredicateError(format!(
            "invalid property path '{word}'"
        )));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_keep_slashes_and_bangs() {
        let tokens = tokenize("ref == refs/heads/main && msg != w00t!").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("ref".into()),
                Token::Op(CmpOp::Eq),
                Token::Word("refs/heads/main".into()),
                Token::And,
                Token::Word("msg".into()),
                Token::Op(CmpOp::Ne),
                Token::Word("w00t!".into()),
            ]
        );
    }

    #[test]
    fn operators_without_spaces() {
        let tokens = tokenize("a.b>=3").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("a.b".into()),
                Token::Op(CmpOp::Ge),
                Token::Word("3".into()),
            ]
        );
    }

    #[test]
    fn regex_literal_after_match_operator() {
        let tokens = tokenize(r"action ~= /^re\/opened$/i").unwrap();
        assert_eq!(
            tokens[2],
            Token::Regex {
                pattern: "^re/opened$".into(),
                flags: "i".into()
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a || b && c").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Truthy(_)));
                assert!(matches!(*rhs, Expr::And(_, _)));
            }
            other => panic!("expected Or at the root, got {other:?}"),
        }
    }

    #[test]
    fn parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("(a == b").is_err());
        assert!(parse("a == 'open").is_err());
        assert!(parse("== b").is_err());
        assert!(parse("a ==").is_err());
        assert!(parse("a..b").is_err());
        assert!(parse("a ~= /(/").is_err());
        assert!(parse("a b").is_err());
    }
}
