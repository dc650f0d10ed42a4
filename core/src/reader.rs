//! Recursive-descent reader: text to values.
//!
//! Reader macros (`'`, `` ` ``, `~`, `~@`, `@`) expand here into their long
//! forms, so the evaluator only ever sees plain lists.

use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};
use crate::value::{Value, cons, list, list_len, reverse};

pub struct Reader {
    lexer: Lexer,
}

impl Reader {
    pub fn new(input: &str) -> Self {
        Reader {
            lexer: Lexer::new(input),
        }
    }

    /// Read the next top-level form, or `None` once only whitespace and
    /// comments remain.
    pub fn next_form(&mut self) -> Result<Option<Value>> {
        match self.lexer.next_token()? {
            Token::Eof => Ok(None),
            token => self.read_form_from(token).map(Some),
        }
    }

    fn read_form(&mut self) -> Result<Value> {
        let token = self.lexer.next_token()?;
        self.read_form_from(token)
    }

    fn read_form_from(&mut self, token: Token) -> Result<Value> {
        match token {
            Token::LParen => self.read_sequence(Token::RParen),
            Token::LBracket => self.read_sequence(Token::RBracket).map(Value::vector),
            Token::LBrace => {
                let entries = self.read_sequence(Token::RBrace)?;
                if list_len(&entries) % 2 != 0 {
                    return Err(Error::invalid_token(
                        "hash-map literal needs an even number of forms",
                    ));
                }
                Ok(Value::map(entries))
            }
            Token::RParen => Err(Error::invalid_token("unexpected ')'")),
            Token::RBracket => Err(Error::invalid_token("unexpected ']'")),
            Token::RBrace => Err(Error::invalid_token("unexpected '}'")),
            Token::Quote => self.read_wrapped("quote"),
            Token::Quasiquote => self.read_wrapped("quasiquote"),
            Token::Unquote => self.read_wrapped("unquote"),
            Token::SpliceUnquote => self.read_wrapped("splice-unquote"),
            Token::Deref => self.read_wrapped("deref"),
            Token::Str(s) => Ok(Value::string(s)),
            Token::Keyword(name) => Ok(Value::keyword(&name)),
            Token::Int(n) => Ok(Value::Int(n)),
            Token::Symbol(name) => Ok(match name.as_str() {
                "nil" => Value::Nil,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::symbol(&name),
            }),
            Token::Eof => Err(Error::incomplete("unexpected end of input")),
        }
    }

    /// `'x` becomes `(quote x)` and so on
    fn read_wrapped(&mut self, head: &str) -> Result<Value> {
        let form = self.read_form()?;
        Ok(list([Value::symbol(head), form]))
    }

    /// Child forms up to `close`, as a proper list
    fn read_sequence(&mut self, close: Token) -> Result<Value> {
        let mut reversed = Value::Nil;
        loop {
            let token = self.lexer.next_token()?;
            if token == close {
                return Ok(reverse(&reversed));
            }
            match token {
                Token::Eof => {
                    return Err(Error::incomplete(format!(
                        "expected '{}', got end of input",
                        closer_char(&close)
                    )));
                }
                Token::RParen | Token::RBracket | Token::RBrace => {
                    return Err(Error::invalid_token(format!(
                        "expected '{}', got '{}'",
                        closer_char(&close),
                        closer_char(&token)
                    )));
                }
                token => reversed = cons(self.read_form_from(token)?, reversed),
            }
        }
    }
}

fn closer_char(token: &Token) -> char {
    match token {
        Token::RBracket => ']',
        Token::RBrace => '}',
        _ => ')',
    }
}

/// Read exactly one form from the head of `input`; trailing text is ignored.
pub fn read(input: &str) -> Result<Value> {
    Reader::new(input)
        .next_form()?
        .ok_or_else(|| Error::incomplete("no form to read"))
}

/// Read every form in `input` into a list
pub fn read_all(input: &str) -> Result<Value> {
    let mut reader = Reader::new(input);
    let mut reversed = Value::Nil;
    while let Some(form) = reader.next_form()? {
        reversed = cons(form, reversed);
    }
    Ok(reverse(&reversed))
}
