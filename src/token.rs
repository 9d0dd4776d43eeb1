// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Hand-written SQL lexer and the peekable, position-tracked [TokenStream]
//! the parsers and the template extractor all drive.
//!

use crate::{MyError, queryable::Q};
use core::fmt;
use regex::Regex;
use unicase::UniCase;

/// Reserved words. Membership decides keyword-ness at classification time,
/// case-insensitively; the lexer itself is oblivious to them.
const KEYWORDS: &[&str] = &[
    "AND", "AS", "ASC", "BETWEEN", "BY", "CREATE", "DESC", "DESCRIBE", "FALSE", "FROM", "GROUP",
    "IN", "INSERT", "INTO", "IS", "LIKE", "LIMIT", "NOT", "NULL", "OR", "ORDER", "SELECT", "TRUE",
    "VALUES", "VIEW", "WHERE",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| UniCase::new(*k) == UniCase::new(word))
}

/// Lexical category of a [Token].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A bare name; e.g. a column, a view or a function.
    Identifier,
    /// A reserved word; e.g. `SELECT`, `NOT`.
    Keyword,
    /// An integer, decimal or exponent-form numeric literal.
    Number,
    /// A quoted character string literal. The token text carries the
    /// *unescaped* content w/o the surrounding quotes.
    Str,
    /// `= <> != < <= > >= + - * /`
    Operator,
    /// `, ( ) ; .`
    Punctuation,
}

/// One syntactic token. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Raw text for most kinds; unescaped content for [Kind::Str].
    pub text: String,
    /// Lexical category.
    pub kind: Kind,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'", self.text)
    }
}

impl Token {
    /// Lower a literal token to the payload it denotes. Identifiers and the
    /// rest lower to their text.
    pub fn value(&self) -> Result<Q, MyError> {
        match self.kind {
            Kind::Number => self
                .text
                .parse::<f64>()
                .map(Q::Num)
                .map_err(|_| MyError::runtime(format!("'{}' is not a number", self.text))),
            Kind::Str => Ok(Q::Str(self.text.clone())),
            Kind::Keyword if self.text.eq_ignore_ascii_case("true") => Ok(Q::Bool(true)),
            Kind::Keyword if self.text.eq_ignore_ascii_case("false") => Ok(Q::Bool(false)),
            Kind::Keyword if self.text.eq_ignore_ascii_case("null") => Ok(Q::Null),
            _ => Ok(Q::Str(self.text.clone())),
        }
    }
}

// The lexer proper. Indexed scanning (rather than a char iterator) so the
// 2-char forms (`<=`, `--` comments, doubled quotes) need no buffering.
struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    // skip whitespace and `-- line` comments...
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, MyError> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = |text: String, kind: Kind| Token { text, kind, line, column };

        match c {
            x if x.is_ascii_alphabetic() || x == '_' => {
                let mut s = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        s.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let kind = if is_keyword(&s) { Kind::Keyword } else { Kind::Identifier };
                Ok(Some(token(s, kind)))
            }
            x if x.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    s.push('.');
                    self.bump();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_digit() {
                            s.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                if matches!(self.peek(), Some('e') | Some('E')) {
                    let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
                    let digit_at = if sign { 2 } else { 1 };
                    if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                        s.push(self.bump().unwrap_or('e'));
                        if sign {
                            s.push(self.bump().unwrap_or('+'));
                        }
                        while let Some(c) = self.peek() {
                            if c.is_ascii_digit() {
                                s.push(c);
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                }
                Ok(Some(token(s, Kind::Number)))
            }
            q @ ('\'' | '"') => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.peek() {
                        None => {
                            return Err(MyError::syntax("Unterminated string literal", line, column));
                        }
                        Some(c) if c == q => {
                            self.bump();
                            // the usual SQL doubled-quote escape...
                            if self.peek() == Some(q) {
                                s.push(q);
                                self.bump();
                            } else {
                                break;
                            }
                        }
                        Some(c) => {
                            s.push(c);
                            self.bump();
                        }
                    }
                }
                Ok(Some(token(s, Kind::Str)))
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        Ok(Some(token("<=".into(), Kind::Operator)))
                    }
                    Some('>') => {
                        self.bump();
                        Ok(Some(token("<>".into(), Kind::Operator)))
                    }
                    _ => Ok(Some(token("<".into(), Kind::Operator))),
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Ok(Some(token(">=".into(), Kind::Operator)))
                } else {
                    Ok(Some(token(">".into(), Kind::Operator)))
                }
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Ok(Some(token("!=".into(), Kind::Operator)))
                } else {
                    Err(MyError::syntax("Unexpected character '!'", line, column))
                }
            }
            '=' | '+' | '-' | '*' | '/' => {
                self.bump();
                Ok(Some(token(c.to_string(), Kind::Operator)))
            }
            ',' | '(' | ')' | ';' | '.' => {
                self.bump();
                Ok(Some(token(c.to_string(), Kind::Punctuation)))
            }
            _ => Err(MyError::syntax(format!("Unexpected character '{c}'"), line, column)),
        }
    }
}

/// Ordered finite sequence of [Token]s w/ a monotonically advancing cursor.
/// Lookahead never exceeds a single token, and there is no rewind.
#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Lex the given input in full, failing on the first unrecognized
    /// character.
    pub fn new(input: &str) -> Result<Self, MyError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        while let Some(t) = lexer.next_token()? {
            tokens.push(t);
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Return TRUE if at least one more token remains; FALSE otherwise.
    pub fn has_next(&self) -> bool {
        self.pos < self.tokens.len()
    }

    /// Return the upcoming token w/o consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the upcoming token, or fail at end of input.
    pub fn next(&mut self) -> Result<Token, MyError> {
        match self.tokens.get(self.pos) {
            Some(t) => {
                self.pos += 1;
                Ok(t.clone())
            }
            None => Err(self.syntax_error("Unexpected end of input")),
        }
    }

    /// Return TRUE if the upcoming token's text matches (case-insensitively)
    /// the given text; FALSE otherwise. String literals never match.
    pub fn is(&self, text: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind != Kind::Str && t.text.eq_ignore_ascii_case(text))
    }

    /// Consume the upcoming token iff it matches the given text. Return TRUE
    /// when consumed; on FALSE the cursor is untouched.
    pub fn next_if(&mut self, text: &str) -> bool {
        if self.is(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Return TRUE if the upcoming token's text matches the given pattern;
    /// FALSE otherwise. Never consumes.
    pub fn matches(&self, pattern: &Regex) -> bool {
        self.peek().is_some_and(|t| pattern.is_match(&t.text))
    }

    /// Consume the upcoming token, failing unless it matches the given text.
    pub fn expect(&mut self, text: &str) -> Result<Token, MyError> {
        if self.is(text) {
            self.next()
        } else {
            Err(self.syntax_error(format!("Expected '{text}'")))
        }
    }

    /// A [syntax error][MyError::Syntax] pointing at the current token, or at
    /// the last one when the input is exhausted.
    pub(crate) fn syntax_error(&self, message: impl Into<String>) -> MyError {
        let mut message = message.into();
        let (line, column) = match self.peek().or_else(|| self.tokens.last()) {
            Some(t) => {
                message = format!("{message}, found {t}");
                (t.line, t.column)
            }
            None => (1, 1),
        };
        MyError::syntax(message, line, column)
    }
}
