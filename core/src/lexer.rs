use crate::error::{Error, Result};

// ============================================================================
// Lexer
// ============================================================================

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> char {
        if self.position < self.input.len() {
            self.input[self.position]
        } else {
            '\0'
        }
    }

    fn peek_ahead(&self, n: usize) -> char {
        if self.position + n < self.input.len() {
            self.input[self.position + n]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Commas count as whitespace
    fn skip_whitespace(&mut self) {
        loop {
            while !self.is_eof() && (self.current_char().is_whitespace() || self.current_char() == ',')
            {
                self.advance();
            }

            if !self.is_eof() && self.current_char() == ';' {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while !self.is_eof() && self.current_char() != '\n' {
            self.advance();
        }
        if self.current_char() == '\n' {
            self.advance();
        }
    }

    // ========================================================================
    // String Parsing
    // ========================================================================

    fn read_string(&mut self) -> Result<Token> {
        // opening quote
        self.advance();
        let mut content = String::new();

        while !self.is_eof() && self.current_char() != '"' {
            if self.current_char() == '\\' {
                self.advance();
                if self.is_eof() {
                    break;
                }
                content.push(self.read_escape_sequence()?);
            } else {
                content.push(self.current_char());
                self.advance();
            }
        }

        if self.is_eof() {
            return Err(Error::incomplete("unterminated string"));
        }

        self.advance();
        Ok(Token::Str(content))
    }

    fn read_escape_sequence(&mut self) -> Result<char> {
        let c = self.current_char();
        self.advance();

        match c {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '\\' => Ok('\\'),
            '"' => Ok('"'),
            _ => Err(Error::invalid_token(format!("unknown escape sequence: \\{c}"))),
        }
    }

    // ========================================================================
    // Number and Symbol Parsing
    // ========================================================================

    fn is_delimiter(c: char) -> bool {
        c.is_whitespace()
            || matches!(
                c,
                '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '`' | '~' | '@' | '"' | ';' | ','
            )
    }

    fn read_atom_text(&mut self) -> String {
        let mut text = String::new();
        while !self.is_eof() && !Self::is_delimiter(self.current_char()) {
            text.push(self.current_char());
            self.advance();
        }
        text
    }

    /// Integer literal with optional leading '-'
    fn read_number(&mut self) -> Result<Token> {
        let text = self.read_atom_text();
        let digits = text.strip_prefix('-').unwrap_or(&text);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid_token(format!("invalid number: {text}")));
        }
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| Error::invalid_token(format!("integer out of range: {text}")))
    }

    fn read_keyword(&mut self) -> Result<Token> {
        // leading ':'
        self.advance();
        let name = self.read_atom_text();
        if name.is_empty() {
            return Err(Error::invalid_token("expected keyword name after ':'"));
        }
        Ok(Token::Keyword(name))
    }

    // ========================================================================
    // Main Tokenization
    // ========================================================================

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        if self.is_eof() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();
        let simple = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '\'' => Some(Token::Quote),
            '`' => Some(Token::Quasiquote),
            '@' => Some(Token::Deref),
            _ => None,
        };
        if let Some(token) = simple {
            self.advance();
            return Ok(token);
        }

        match ch {
            '~' => {
                self.advance();
                if self.current_char() == '@' {
                    self.advance();
                    Ok(Token::SpliceUnquote)
                } else {
                    Ok(Token::Unquote)
                }
            }
            '"' => self.read_string(),
            ':' => self.read_keyword(),
            ch if ch.is_ascii_digit() => self.read_number(),
            '-' if self.peek_ahead(1).is_ascii_digit() => self.read_number(),
            _ => Ok(Token::Symbol(self.read_atom_text())),
        }
    }
}

// ============================================================================
// Token Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    Quasiquote,
    Unquote,
    SpliceUnquote,
    Deref,
    Str(String),
    Keyword(String),
    Int(i64),
    Symbol(String),
    Eof,
}
