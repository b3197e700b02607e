//! Tokenizer and parser for the traversal DSL.
//!
//! The surface syntax is a single chain of step calls rooted at `g`:
//!
//! ```text
//! g.out('resolvesTo').has('value', '1.2.3.4').values('value')
//! ```
//!
//! Parsing is deliberately generic: any identifier is accepted as a step
//! name and arguments may be strings, integers, bare identifiers or nested
//! calls (for `repeat(out('x'), 3)`). Whether a step actually exists — and
//! whether the sandbox allows it — is decided later, against the operation
//! whitelist, so disallowed operations are rejected uniformly before
//! execution rather than surfacing as parse quirks.

use crate::error::QueryError;

/// A lexical token with its byte position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Dot,
    LParen,
    RParen,
    Comma,
}

/// One parsed step call, e.g. `out('resolvesTo')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
    /// Byte position of the call name, for error reporting.
    pub position: usize,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Str(String),
    Int(i64),
    /// A bare identifier, e.g. `repeat(out)`.
    Ident(String),
    /// A nested call, e.g. `repeat(out('x'))`.
    Call(Call),
}

fn syntax(message: impl Into<String>, position: usize) -> QueryError {
    QueryError::Syntax {
        message: message.into(),
        position,
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, QueryError> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '.' => {
                tokens.push((Token::Dot, position));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, position));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, position));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, position));
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let start = position;
                i += 1;
                let mut value = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(syntax("unterminated string literal", start)),
                        Some((_, ch)) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some((_, ch)) => {
                            value.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push((Token::Str(value), start));
            }
            '0'..='9' | '-' => {
                let start = position;
                if c == '-' {
                    i += 1;
                }
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
                let end = chars.get(i).map(|(p, _)| *p).unwrap_or(input.len());
                let text = &input[start..end];
                let value = text
                    .parse::<i64>()
                    .map_err(|_| syntax(format!("invalid number \"{text}\""), start))?;
                tokens.push((Token::Int(value), start));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = position;
                while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let end = chars.get(i).map(|(p, _)| *p).unwrap_or(input.len());
                tokens.push((Token::Ident(input[start..end].to_string()), start));
            }
            _ => return Err(syntax(format!("unexpected character '{c}'"), position)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    cursor: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map(|(_, p)| *p).unwrap_or(self.input_len)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<usize, QueryError> {
        match self.next() {
            Some((token, position)) if token == expected => Ok(position),
            Some((_, position)) => Err(syntax(format!("expected {what}"), position)),
            None => Err(syntax(format!("expected {what}"), self.input_len)),
        }
    }

    fn parse_call(&mut self) -> Result<Call, QueryError> {
        let (name, position) = match self.next() {
            Some((Token::Ident(name), position)) => (name, position),
            Some((_, position)) => return Err(syntax("expected step name", position)),
            None => return Err(syntax("expected step name", self.input_len)),
        };
        self.expect(Token::LParen, "'(' after step name")?;

        let mut args = Vec::new();
        if !matches!(self.peek(), Some((Token::RParen, _))) {
            loop {
                args.push(self.parse_arg()?);
                match self.peek() {
                    Some((Token::Comma, _)) => {
                        self.next();
                    }
                    _ => break,
                }
            }
        }
        self.expect(Token::RParen, "')' closing the argument list")?;

        Ok(Call {
            name,
            args,
            position,
        })
    }

    fn parse_arg(&mut self) -> Result<Arg, QueryError> {
        match self.peek().cloned() {
            Some((Token::Str(value), _)) => {
                self.next();
                Ok(Arg::Str(value))
            }
            Some((Token::Int(value), _)) => {
                self.next();
                Ok(Arg::Int(value))
            }
            Some((Token::Ident(name), _)) => {
                // Lookahead: `ident(` is a nested call, bare `ident` is not.
                if matches!(self.tokens.get(self.cursor + 1), Some((Token::LParen, _))) {
                    Ok(Arg::Call(self.parse_call()?))
                } else {
                    self.next();
                    Ok(Arg::Ident(name))
                }
            }
            Some((_, position)) => Err(syntax("expected argument", position)),
            None => Err(syntax("expected argument", self.input_len)),
        }
    }
}

/// Parse a query into its step calls.
///
/// The query must start with the root identifier `g`; every following step
/// is introduced by a dot.
pub fn parse(input: &str) -> Result<Vec<Call>, QueryError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        input_len: input.len(),
    };

    match parser.next() {
        Some((Token::Ident(root), _)) if root == "g" => {}
        Some((_, position)) => return Err(syntax("query must start with 'g'", position)),
        None => return Err(syntax("empty query", 0)),
    }

    let mut calls = Vec::new();
    while parser.peek().is_some() {
        parser.expect(Token::Dot, "'.' before the next step")?;
        calls.push(parser.parse_call()?);
    }

    Ok(calls)
}
