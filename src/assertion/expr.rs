//! Allowlisted predicate expressions for custom assertions
//!
//! A deliberately small grammar: arithmetic and comparison over numbers,
//! with `actual` bound to the extracted field value. Evaluated by a
//! hand-written recursive-descent evaluator; input is never compiled or
//! executed as code.
//!
//! ```text
//! predicate := sum (cmp_op sum)?
//! sum       := term (("+" | "-") term)*
//! term      := factor (("*" | "/" | "%") factor)*
//! factor    := number | "actual" | "-" factor | "(" predicate ")"
//! cmp_op    := "==" | "!=" | "<" | "<=" | ">" | ">="
//! ```

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{0}' in expression")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unknown identifier '{0}'; only 'actual' is allowed")]
    UnknownIdentifier(String),

    #[error("actual value is not a number: {0}")]
    NotANumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression '{0}' is not a comparison")]
    NotAPredicate(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = num
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedToken(num.clone()))?;
                tokens.push(Token::Number(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Eq);
                } else {
                    return Err(ExprError::UnexpectedChar('='));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    return Err(ExprError::UnexpectedChar('!'));
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

/// Evaluation result: either a number or a comparison verdict
enum Evaluated {
    Number(f64),
    Bool(bool),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    actual: f64,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn predicate(&mut self) -> Result<Evaluated, ExprError> {
        let left = self.sum()?;

        let op = match self.peek() {
            Some(Token::Eq) => Some(Token::Eq),
            Some(Token::Ne) => Some(Token::Ne),
            Some(Token::Lt) => Some(Token::Lt),
            Some(Token::Le) => Some(Token::Le),
            Some(Token::Gt) => Some(Token::Gt),
            Some(Token::Ge) => Some(Token::Ge),
            _ => None,
        };

        let Some(op) = op else {
            return Ok(Evaluated::Number(left));
        };
        self.next();

        let right = self.sum()?;
        let verdict = match op {
            Token::Eq => left == right,
            Token::Ne => left != right,
            Token::Lt => left < right,
            Token::Le => left <= right,
            Token::Gt => left > right,
            Token::Ge => left >= right,
            _ => unreachable!(),
        };

        Ok(Evaluated::Bool(verdict))
    }

    fn sum(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.next();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.next();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.next();
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value /= divisor;
                }
                Token::Percent => {
                    self.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value %= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Ident(name)) => {
                if name == "actual" {
                    Ok(self.actual)
                } else {
                    Err(ExprError::UnknownIdentifier(name))
                }
            }
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::LParen) => {
                let value = match self.predicate()? {
                    Evaluated::Number(n) => n,
                    Evaluated::Bool(b) => {
                        if b {
                            1.0
                        } else {
                            0.0
                        }
                    }
                };
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

fn coerce_number(actual: &Value) -> Result<f64, ExprError> {
    match actual {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExprError::NotANumber(actual.to_string())),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ExprError::NotANumber(s.clone())),
        other => Err(ExprError::NotANumber(other.to_string())),
    }
}

/// Evaluate a predicate expression with `actual` bound to the given value.
///
/// The expression must contain a comparison; a purely arithmetic expression
/// is rejected so a typo cannot silently pass.
pub fn eval_predicate(expr: &str, actual: &Value) -> Result<bool, ExprError> {
    let actual = coerce_number(actual)?;
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        actual,
    };
    let evaluated = parser.predicate()?;

    if parser.pos != parser.tokens.len() {
        let leftover = format!("{:?}", parser.tokens[parser.pos]);
        return Err(ExprError::UnexpectedToken(leftover));
    }

    match evaluated {
        Evaluated::Bool(b) => Ok(b),
        Evaluated::Number(_) => Err(ExprError::NotAPredicate(expr.to_string())),
    }
}

/// Quick check that a string is plausibly a predicate expression
pub fn looks_like_expression(s: &str) -> bool {
    s.contains("==")
        || s.contains("!=")
        || s.contains('<')
        || s.contains('>')
}
