//! Error taxonomy for the reader and the evaluator.

use thiserror::Error;

use crate::value::Value;

pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reader failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input ended before the form was complete (or held no form at all)
    Incomplete,
    /// A token that cannot appear where it was found
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("parse error: {message}")]
    Parse {
        kind: ParseErrorKind,
        message: String,
    },

    #[error("'{0}' not found")]
    UnboundSymbol(String),

    #[error("{name}: expected {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("not a function: {0}")]
    NotAFunction(String),

    #[error("{context}: expected {expected}, got {got}")]
    Type {
        context: String,
        expected: &'static str,
        got: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0}: integer overflow")]
    Overflow(&'static str),

    #[error("{name}: index {index} out of range")]
    IndexOutOfRange { name: &'static str, index: i64 },

    #[error("{form}: {message}")]
    BadForm {
        form: &'static str,
        message: String,
    },

    #[error("{0} used outside of quasiquote")]
    MisplacedUnquote(&'static str),

    #[error("uncaught exception: {0}")]
    Thrown(Value),

    #[error("{0}")]
    Io(String),
}

impl Error {
    pub fn parse(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Error::Parse {
            kind,
            message: message.into(),
        }
    }

    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::parse(ParseErrorKind::Incomplete, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::parse(ParseErrorKind::InvalidToken, message)
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    /// A type error naming the offending value
    pub fn type_error(context: impl Into<String>, expected: &'static str, got: &Value) -> Self {
        Error::Type {
            context: context.into(),
            expected,
            got: format!("{} {got}", got.type_name()),
        }
    }

    pub fn bad_form(form: &'static str, message: impl Into<String>) -> Self {
        Error::BadForm {
            form,
            message: message.into(),
        }
    }

    /// True when more input could complete the form being read
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            Error::Parse {
                kind: ParseErrorKind::Incomplete,
                ..
            }
        )
    }
}
