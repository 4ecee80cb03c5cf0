//! Finite-state tokenizer for the collector configuration language
//!
//! Recognizes whitespace (skipped), the single-character operators and
//! brackets `: = { } [ ] ,`, double-quoted text, decimal numbers, the `CIRC`
//! magic literal, and the boolean literals. Scanning never looks ahead more
//! than one character.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{CollectorError, Result};

/// Magic literal opening every configuration file.
pub const MAGIC: &str = "CIRC";

/// One lexical token of the configuration language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// The `CIRC` magic literal.
    Magic,
    /// Double-quoted text, quotes stripped.
    Text(String),
    /// Decimal digit run, kept as text until the grammar knows the target
    /// width.
    Number(String),
    /// `true` or `false`.
    Bool(bool),
    Colon,
    Equals,
    CurlyOpen,
    CurlyClose,
    SquareOpen,
    SquareClose,
    Comma,
    /// End of input.
    End,
}

impl Token {
    /// Grammar-facing name used in syntax error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Magic => "magic literal",
            Token::Text(_) => "quoted text",
            Token::Number(_) => "number",
            Token::Bool(_) => "boolean",
            Token::Colon => "':'",
            Token::Equals => "'='",
            Token::CurlyOpen => "'{'",
            Token::CurlyClose => "'}'",
            Token::SquareOpen => "'['",
            Token::SquareClose => "']'",
            Token::Comma => "','",
            Token::End => "end of input",
        }
    }
}

/// Tokenizer over buffered configuration text
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Produce the next token, `Token::End` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token> {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }

        let Some(&c) = self.chars.peek() else {
            return Ok(Token::End);
        };

        match c {
            ':' => self.single(Token::Colon),
            '=' => self.single(Token::Equals),
            '{' => self.single(Token::CurlyOpen),
            '}' => self.single(Token::CurlyClose),
            '[' => self.single(Token::SquareOpen),
            ']' => self.single(Token::SquareClose),
            ',' => self.single(Token::Comma),
            '"' => self.lex_text(),
            '0'..='9' => Ok(self.lex_number()),
            c if c.is_ascii_alphabetic() => self.lex_word(),
            other => Err(CollectorError::ConfigSyntax(format!(
                "unexpected character {other:?}"
            ))),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.chars.next();
        Ok(token)
    }

    fn lex_text(&mut self) -> Result<Token> {
        self.chars.next(); // opening quote
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(Token::Text(value)),
                Some(c) => value.push(c),
                None => {
                    return Err(CollectorError::ConfigSyntax(
                        "unterminated quoted text".to_string(),
                    ))
                }
            }
        }
    }

    fn lex_number(&mut self) -> Token {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.chars.next();
        }
        Token::Number(digits)
    }

    fn lex_word(&mut self) -> Result<Token> {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            word.push(c);
            self.chars.next();
        }
        match word.as_str() {
            MAGIC => Ok(Token::Magic),
            "true" => Ok(Token::Bool(true)),
            "false" => Ok(Token::Bool(false)),
            other => Err(CollectorError::ConfigSyntax(format!(
                "unexpected word {other:?}"
            ))),
        }
    }
}
