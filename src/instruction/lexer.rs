//! Lexer (tokenizer) for instruction strings.

use crate::error::{CyclerError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Token {
    /// Whether this token is the word `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Token types in an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A word: verb, keyword, unit or drive cycle name
    Word,
    /// A number, possibly signed, with optional fraction and exponent
    Number,
    /// Slash '/', as in `C/20`
    Slash,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// End of input
    Eof,
}

/// Lexer for tokenizing a single instruction.
///
/// Numbers and units may be glued together (`50mA`, `4.1V`); the number
/// ends at the first character that cannot continue it.
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            column: 1,
        }
    }

    /// Tokenize the whole input. The returned list always ends with [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let (pos, ch) = match self.chars.peek().copied() {
            Some(next) => next,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    column: self.column,
                });
            }
        };

        let column = self.column;
        let single = |kind: TokenKind| Token {
            kind,
            text: ch.to_string(),
            column,
        };

        let token = match ch {
            '/' => {
                self.advance();
                single(TokenKind::Slash)
            }
            '(' => {
                self.advance();
                single(TokenKind::OpenParen)
            }
            ')' => {
                self.advance();
                single(TokenKind::CloseParen)
            }
            _ if self.starts_number(pos, ch) => Token {
                kind: TokenKind::Number,
                text: self.read_number(),
                column,
            },
            _ if ch.is_alphabetic() || ch == '_' => Token {
                kind: TokenKind::Word,
                text: self.read_word(),
                column,
            },
            _ => {
                return Err(CyclerError::invalid_instruction(
                    self.input,
                    format!("unexpected character '{}' at column {}", ch, column),
                ));
            }
        };

        Ok(token)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        self.column += 1;
        Some(ch)
    }

    /// Character after the one at byte offset `pos`.
    fn char_after(&self, pos: usize, ch: char) -> Option<char> {
        self.input[pos + ch.len_utf8()..].chars().next()
    }

    fn starts_number(&self, pos: usize, ch: char) -> bool {
        match ch {
            '0'..='9' => true,
            '.' => self.char_after(pos, ch).is_some_and(|c| c.is_ascii_digit()),
            '-' | '+' => self
                .char_after(pos, ch)
                .is_some_and(|c| c.is_ascii_digit() || c == '.'),
            _ => false,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut text = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '-' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        // Optional sign
        if let Some(&(_, ch)) = self.chars.peek() {
            if ch == '-' || ch == '+' {
                text.push(ch);
                self.advance();
            }
        }

        // Integer part
        self.read_digits(&mut text);

        // Decimal part
        if let Some(&(_, '.')) = self.chars.peek() {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }

        // Exponent part, only when digits follow: `2e3` but not `2e` or a glued unit
        if let Some(&(pos, ch)) = self.chars.peek() {
            if ch == 'e' || ch == 'E' {
                let rest = &self.input[pos + 1..];
                let digits_follow = rest.starts_with(|c: char| c.is_ascii_digit())
                    || ((rest.starts_with('-') || rest.starts_with('+'))
                        && rest[1..].starts_with(|c: char| c.is_ascii_digit()));
                if digits_follow {
                    text.push(ch);
                    self.advance();
                    if let Some(&(_, sign)) = self.chars.peek() {
                        if sign == '-' || sign == '+' {
                            text.push(sign);
                            self.advance();
                        }
                    }
                    self.read_digits(&mut text);
                }
            }
        }

        text
    }
}

/// Parse a number token's text.
pub fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
