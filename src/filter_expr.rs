// Copyright 2026 Phonedex Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Conjunctive filter expressions for `--where`, e.g.
//! `brand IN ('Apple', 'Samsung') AND ram >= 8 AND price <= 999`.

use anyhow::Context;
use anyhow::Result;

use crate::filter::Filter;
use crate::filter::RangeField;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CmpOp {
    Eq,
    Lte,
    Gte,
    Like,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Cmp {
        field: String,
        op: CmpOp,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
}

/// Predicates joined by `AND`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    String(String),
    Number(f64),
    Comma,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Keyword(Keyword),
}

#[derive(Debug, Clone, PartialEq)]
enum Keyword {
    And,
    Or,
    Not,
    In,
    Like,
}

pub fn parse_filter(input: &str) -> Result<FilterExpr> {
    let tokens = lex(input)?;
    let mut p = Parser::new(tokens);
    p.parse_expr()
}

/// Parses `input` and layers it onto `filter`.
pub fn apply_str(input: &str, filter: &mut Filter) -> Result<()> {
    let expr = parse_filter(input).with_context(|| format!("parse filter `{input}`"))?;
    apply(&expr, filter)
}

pub fn apply(expr: &FilterExpr, filter: &mut Filter) -> Result<()> {
    for pred in &expr.predicates {
        apply_predicate(pred, filter)?;
    }
    Ok(())
}

fn apply_predicate(pred: &Predicate, filter: &mut Filter) -> Result<()> {
    match pred {
        Predicate::Cmp { field, op, value } => {
            let name = field.to_ascii_lowercase();
            match name.as_str() {
                "q" | "search" | "query" => match op {
                    CmpOp::Eq | CmpOp::Like => filter.set_query(&expect_text(field, value)?),
                    _ => anyhow::bail!("{field} supports = and LIKE"),
                },
                "brand" => match op {
                    CmpOp::Eq => filter.add_brand(&expect_text(field, value)?),
                    _ => anyhow::bail!("brand supports = and IN"),
                },
                "processor" => match op {
                    CmpOp::Eq | CmpOp::Like => filter.set_processor(&expect_text(field, value)?),
                    _ => anyhow::bail!("processor supports = and LIKE"),
                },
                "year" => match op {
                    CmpOp::Eq => filter.add_year(expect_year(value)?),
                    _ => anyhow::bail!("year supports = and IN"),
                },
                _ => {
                    let Some(range) = RangeField::parse(&name) else {
                        anyhow::bail!("unknown field {field}");
                    };
                    let n = expect_number(field, value)?;
                    match op {
                        CmpOp::Gte => filter.set_min(range, Some(n)),
                        CmpOp::Lte => filter.set_max(range, Some(n)),
                        CmpOp::Eq => filter.set_range(range, Some(n), Some(n)),
                        CmpOp::Like => anyhow::bail!("{field} does not support LIKE"),
                    }
                }
            }
        }
        Predicate::In { field, values } => match field.to_ascii_lowercase().as_str() {
            "brand" => {
                for value in values {
                    filter.add_brand(&expect_text(field, value)?);
                }
            }
            "year" => {
                for value in values {
                    filter.add_year(expect_year(value)?);
                }
            }
            _ => anyhow::bail!("IN is only supported for brand and year"),
        },
    }
    Ok(())
}

fn expect_text(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) => anyhow::bail!("{field} expects a quoted string"),
    }
}

fn expect_number(field: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(_) => anyhow::bail!("{field} expects a number"),
    }
}

fn expect_year(value: &Value) -> Result<u32> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
            Ok(*n as u32)
        }
        _ => anyhow::bail!("year expects a whole number"),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_expr(&mut self) -> Result<FilterExpr> {
        let mut predicates = vec![self.parse_term()?];
        loop {
            if self.peek_keyword(Keyword::And) {
                self.next();
                predicates.push(self.parse_term()?);
            } else if self.peek_keyword(Keyword::Or) {
                anyhow::bail!("OR is not supported; use IN (...) for alternatives");
            } else {
                break;
            }
        }
        if let Some(tok) = self.peek_token() {
            anyhow::bail!("unexpected token {:?}", tok);
        }
        Ok(FilterExpr { predicates })
    }

    fn parse_term(&mut self) -> Result<Predicate> {
        if self.peek_keyword(Keyword::Not) {
            anyhow::bail!("NOT is not supported");
        }
        let field = self.expect_ident()?;
        if self.peek_keyword(Keyword::In) {
            self.next();
            self.expect(Token::LParen)?;
            let mut values = Vec::new();
            loop {
                values.push(self.expect_value()?);
                if self.peek(Token::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            Ok(Predicate::In { field, values })
        } else {
            let op = self.parse_cmp_op()?;
            let value = self.expect_value()?;
            Ok(Predicate::Cmp { field, op, value })
        }
    }

    fn parse_cmp_op(&mut self) -> Result<CmpOp> {
        if self.peek(Token::Eq) {
            self.next();
            Ok(CmpOp::Eq)
        } else if self.peek(Token::Lte) {
            self.next();
            Ok(CmpOp::Lte)
        } else if self.peek(Token::Gte) {
            self.next();
            Ok(CmpOp::Gte)
        } else if self.peek_keyword(Keyword::Like) {
            self.next();
            Ok(CmpOp::Like)
        } else if self.peek(Token::Lt) {
            anyhow::bail!("'<' is not supported; bounds are inclusive, use '<='")
        } else if self.peek(Token::Gt) {
            anyhow::bail!("'>' is not supported; bounds are inclusive, use '>='")
        } else if self.peek(Token::Ne) {
            anyhow::bail!("'!=' is not supported")
        } else {
            anyhow::bail!("expected comparison operator")
        }
    }

    fn expect_value(&mut self) -> Result<Value> {
        if let Some(Token::String(s)) = self.peek_token() {
            self.next();
            Ok(Value::String(s))
        } else if let Some(Token::Number(n)) = self.peek_token() {
            self.next();
            Ok(Value::Number(n))
        } else {
            anyhow::bail!("expected value")
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        if let Some(Token::Ident(s)) = self.peek_token() {
            self.next();
            Ok(s)
        } else {
            anyhow::bail!("expected field name")
        }
    }

    fn peek(&self, token: Token) -> bool {
        self.peek_token().as_ref() == Some(&token)
    }

    fn peek_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_token(), Some(Token::Keyword(k)) if k == kw)
    }

    fn peek_token(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.peek(token.clone()) {
            self.next();
            Ok(())
        } else {
            anyhow::bail!("expected token {:?}", token)
        }
    }
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut chars = input.chars().peekable();
    let mut tokens = Vec::new();
    while let Some(ch) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        match ch {
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
                continue;
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
                continue;
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
                continue;
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
                continue;
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                    continue;
                }
                anyhow::bail!("unexpected '!'");
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Lte);
                } else {
                    tokens.push(Token::Lt);
                }
                continue;
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Gte);
                } else {
                    tokens.push(Token::Gt);
                }
                continue;
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut buf = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        if let Some(esc) = chars.next() {
                            buf.push(esc);
                        }
                    } else {
                        buf.push(c);
                    }
                }
                if !closed {
                    anyhow::bail!("unterminated string literal: {quote}{buf}");
                }
                tokens.push(Token::String(buf));
                continue;
            }
            _ => {}
        }
        if ch.is_ascii_digit() {
            let mut buf = String::new();
            while let Some(c) = chars.peek().copied() {
                if c.is_ascii_digit() || c == '.' {
                    buf.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let num: f64 = buf.parse().context("parse number")?;
            tokens.push(Token::Number(num));
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' {
            let mut buf = String::new();
            while let Some(c) = chars.peek().copied() {
                if c.is_alphanumeric() || c == '_' {
                    buf.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let kw = match buf.to_lowercase().as_str() {
                "and" => Some(Keyword::And),
                "or" => Some(Keyword::Or),
                "not" => Some(Keyword::Not),
                "in" => Some(Keyword::In),
                "like" => Some(Keyword::Like),
                _ => None,
            };
            match kw {
                Some(k) => tokens.push(Token::Keyword(k)),
                None => tokens.push(Token::Ident(buf)),
            }
            continue;
        }
        anyhow::bail!("unexpected character {ch}");
    }

    Ok(tokens)
}
