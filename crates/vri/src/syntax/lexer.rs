//! Tokenizer for generated C/C++ function bodies

use crate::result::{VriError, VriResult};

/// Token types from lexical analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword, `::`-qualified names folded in
    Ident(String),
    /// Numeric literal with its suffix
    Number(String),
    /// Character literal including quotes
    Char(String),
    /// String literal including quotes
    Str(String),
    /// Operator or punctuation
    Punct(&'static str),
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token type
    pub kind: TokenKind,
    /// Byte offset into the input
    pub offset: usize,
}

impl Token {
    /// Whether this token is the punctuation `p`
    #[must_use]
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    /// Whether this token is the keyword or identifier `word`
    #[must_use]
    pub fn is_ident(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(name) if name == word)
    }
}

// Longest first so that maximal munch falls out of a linear search.
const PUNCTUATION: &[&str] = &[
    "<<=", ">>=", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=",
    "*=", "/=", "%=", "&=", "^=", "|=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "~", "&",
    "|", "^", "?", ":", ";", ",", ".", "(", ")", "[", "]", "{", "}",
];

/// Tokenizer for converting body text to tokens
#[derive(Debug)]
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    /// Creates a new tokenizer for the given input
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenizes the entire input
    pub fn tokenize(&mut self) -> VriResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Returns the next token, or None if at end of input
    pub fn next_token(&mut self) -> VriResult<Option<Token>> {
        self.skip_trivia()?;

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };
        let offset = self.pos;

        let kind = match ch {
            '#' if self.at_line_start() => {
                return Err(VriError::syntax(offset, "preprocessor directive in body"));
            }
            c if c.is_ascii_digit() => self.read_number(),
            '.' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_ident(),
            ':' if self.rest().starts_with("::")
                && self
                    .peek_char(2)
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_') =>
            {
                self.read_ident()
            }
            '\'' => TokenKind::Char(self.read_quoted('\'')?),
            '"' => TokenKind::Str(self.read_quoted('"')?),
            _ => {
                let punct = PUNCTUATION
                    .iter()
                    .find(|p| self.rest().starts_with(**p))
                    .ok_or_else(|| {
                        VriError::syntax(offset, format!("Unexpected character: '{ch}'"))
                    })?;
                self.pos += punct.len();
                TokenKind::Punct(punct)
            }
        };

        Ok(Some(Token { kind, offset }))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn at_line_start(&self) -> bool {
        self.input[..self.pos]
            .chars()
            .rev()
            .take_while(|c| *c != '\n')
            .all(char::is_whitespace)
    }

    fn skip_trivia(&mut self) -> VriResult<()> {
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if let Some(comment) = rest.strip_prefix("/*") {
                let end = comment
                    .find("*/")
                    .ok_or_else(|| VriError::syntax(self.pos, "Unterminated comment"))?;
                self.pos += end + 4;
            } else if self.current_char().is_some_and(char::is_whitespace) {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    fn read_number(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Number(self.input[start..self.pos].to_string())
    }

    fn read_ident(&mut self) -> TokenKind {
        let start = self.pos;
        loop {
            if self.rest().starts_with("::") {
                let after = self.rest()[2..].chars().next();
                if !after.is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
                    break;
                }
                self.pos += 2;
            }
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
            if !self.rest().starts_with("::") {
                break;
            }
        }
        TokenKind::Ident(self.input[start..self.pos].to_string())
    }

    fn read_quoted(&mut self, quote: char) -> VriResult<String> {
        let start = self.pos;
        self.advance();
        loop {
            match self.current_char() {
                None | Some('\n') => {
                    return Err(VriError::syntax(start, "Unterminated literal"));
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(self.input[start..self.pos].to_string());
                }
                Some(_) => self.advance(),
            }
        }
    }
}
