//! Character-class tokenizer for expression text.
//!
//! ASCII letters and digits (and any character above U+00FF) form words,
//! everything at or below `' '` is whitespace, `"` delimits quoted literals
//! and every other character is returned on its own. A single token can be
//! pushed back and re-read.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// What a token is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word(String),
    Quoted(String),
    Char(char),
    Eof,
}

/// A token and the line it finished on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    /// Text of a word or quoted literal.
    pub fn literal(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(s) | TokenKind::Quoted(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_char(&self, c: char) -> bool {
        self.kind == TokenKind::Char(c)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Word(s) | TokenKind::Quoted(s) => write!(f, "Token[{s}], line {}", self.line),
            TokenKind::Char(c) => write!(f, "Token['{c}'], line {}", self.line),
            TokenKind::Eof => write!(f, "Token[EOF], line {}", self.line),
        }
    }
}

/// True for characters that may appear in an unquoted literal.
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || u32::from(c) > 0xFF
}

fn is_whitespace(c: char) -> bool {
    u32::from(c) <= 0x20
}

/// Pull-based tokenizer over a borrowed string.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    current: Token,
    pushed_back: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            current: Token {
                kind: TokenKind::Eof,
                line: 1,
            },
            pushed_back: false,
        }
    }

    /// Advance and return the next token (or the pushed-back one).
    pub fn next_token(&mut self) -> &Token {
        if self.pushed_back {
            self.pushed_back = false;
            return &self.current;
        }
        let kind = self.scan();
        self.current = Token {
            kind,
            line: self.line,
        };
        &self.current
    }

    /// Make the next call to [`next_token`](Self::next_token) return the
    /// current token again.
    pub fn push_back(&mut self) {
        self.pushed_back = true;
    }

    /// The most recently read token.
    pub fn current(&self) -> &Token {
        &self.current
    }

    fn scan(&mut self) -> TokenKind {
        while let Some(&c) = self.chars.peek() {
            if !is_whitespace(c) {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.chars.next();
        }

        let Some(c) = self.chars.next() else {
            return TokenKind::Eof;
        };

        if is_word_char(c) {
            let mut word = String::from(c);
            while let Some(&next) = self.chars.peek() {
                if !is_word_char(next) {
                    break;
                }
                word.push(next);
                self.chars.next();
            }
            return TokenKind::Word(word);
        }

        if c == '"' {
            return TokenKind::Quoted(self.scan_quoted());
        }

        TokenKind::Char(c)
    }

    fn scan_quoted(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '"' => break,
                '\\' => match self.chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(other) => text.push(other),
                    None => break,
                },
                '\n' => {
                    self.line += 1;
                    text.push(c);
                }
                _ => text.push(c),
            }
        }
        text
    }
}
